//! Target metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::DispatchOutcome;

/// Metrics for a single target
#[derive(Debug, Default)]
pub struct TargetMetrics {
    /// Requests attempted
    attempt_count: AtomicU64,
    /// Requests that succeeded
    success_count: AtomicU64,
    /// Requests that failed (transport, rejection, fault)
    failure_count: AtomicU64,
    /// Polls that did not reach the network stage
    skipped_count: AtomicU64,
    /// Due polls with no eligible reading
    empty_count: AtomicU64,
    /// Current send interval in milliseconds
    interval_ms: AtomicU64,
}

impl TargetMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one dispatch outcome into the counters
    pub fn record(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Skipped(_) => {
                self.skipped_count.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::Empty => {
                self.empty_count.fetch_add(1, Ordering::Relaxed);
            }
            DispatchOutcome::Sent {
                attempted,
                succeeded,
            } => {
                self.attempt_count
                    .fetch_add(*attempted as u64, Ordering::Relaxed);
                self.success_count
                    .fetch_add(*succeeded as u64, Ordering::Relaxed);
                self.failure_count
                    .fetch_add(outcome.failed() as u64, Ordering::Relaxed);
            }
            DispatchOutcome::Faulted(_) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Set current send interval
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn attempt_count(&self) -> u64 {
        self.attempt_count.load(Ordering::Relaxed)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    pub fn empty_count(&self) -> u64 {
        self.empty_count.load(Ordering::Relaxed)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempt_count: self.attempt_count(),
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            skipped_count: self.skipped_count(),
            empty_count: self.empty_count(),
            interval_ms: self.interval_ms(),
        }
    }
}

/// Snapshot of target metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempt_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
    pub empty_count: u64,
    pub interval_ms: u64,
}
