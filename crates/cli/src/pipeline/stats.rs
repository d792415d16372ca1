//! Forwarder run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DispatchMetricsAggregator;

/// Statistics from a forwarder run
#[derive(Debug, Clone, Default)]
pub struct ForwarderStats {
    /// Poll ticks, including those whose snapshot failed
    pub ticks: u64,

    /// Poll ticks whose snapshot could not be read
    pub snapshot_errors: u64,

    /// Successful configuration reloads
    pub reloads: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-target counters kept by the dispatch handler
    pub targets: Vec<(String, MetricsSnapshot)>,

    /// Aggregated dispatch metrics
    pub dispatch_metrics: DispatchMetricsAggregator,
}

impl ForwarderStats {
    /// Requests that reached a target, across all targets
    pub fn requests_attempted(&self) -> u64 {
        self.targets.iter().map(|(_, m)| m.attempt_count).sum()
    }

    pub fn requests_succeeded(&self) -> u64 {
        self.targets.iter().map(|(_, m)| m.success_count).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Forwarder Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Poll ticks: {}", self.ticks);
        println!("   ├─ Snapshot errors: {}", self.snapshot_errors);
        println!("   ├─ Reloads: {}", self.reloads);
        println!(
            "   └─ Requests: {} attempted, {} succeeded",
            self.requests_attempted(),
            self.requests_succeeded()
        );

        if !self.targets.is_empty() {
            println!("\n📤 Targets");
            for (i, (name, m)) in self.targets.iter().enumerate() {
                let prefix = if i == self.targets.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: sent={}/{} failed={} skipped={} empty={} interval={}ms",
                    prefix,
                    name,
                    m.success_count,
                    m.attempt_count,
                    m.failure_count,
                    m.skipped_count,
                    m.empty_count,
                    m.interval_ms
                );
            }
        }

        let summary = self.dispatch_metrics.summary();
        println!("\n📈 Dispatch");
        println!("   ├─ Dispatch time (ms): {}", summary.dispatch_ms);
        println!("   └─ Fresh readings per poll: {}", summary.fresh_readings);

        println!();
    }
}
