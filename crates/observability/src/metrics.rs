//! 分发指标收集模块
//!
//! 基于 DispatchOutcome 收集和统计各 target 的发送指标。

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::DispatchOutcome;
use metrics::{counter, gauge, histogram};

/// 从 DispatchOutcome 记录指标
///
/// 每个 poll tick、每个 target 调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch;
///
/// let report = handler.dispatch(&snapshot).await;
/// for (target, outcome) in &report.outcomes {
///     record_dispatch(target, outcome);
/// }
/// ```
pub fn record_dispatch(target: &str, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Skipped(reason) => {
            counter!(
                "tilt_forwarder_skips_total",
                "target" => target.to_string(),
                "reason" => reason.to_string()
            )
            .increment(1);
        }
        DispatchOutcome::Empty => {
            counter!("tilt_forwarder_empty_batches_total", "target" => target.to_string())
                .increment(1);
        }
        DispatchOutcome::Sent { succeeded, .. } => {
            record_sends(target, "success", *succeeded);
            record_sends(target, "failure", outcome.failed());
        }
        DispatchOutcome::Faulted(_) => {
            record_sends(target, "fault", 1);
        }
    }
}

fn record_sends(target: &str, status: &'static str, count: usize) {
    if count > 0 {
        counter!(
            "tilt_forwarder_sends_total",
            "target" => target.to_string(),
            "status" => status
        )
        .increment(count as u64);
    }
}

/// 记录 target 当前发送间隔
pub fn record_send_interval(target: &str, interval: Duration) {
    gauge!(
        "tilt_forwarder_send_interval_ms",
        "target" => target.to_string()
    )
    .set(interval.as_millis() as f64);
}

/// 记录一次 poll 的快照规模
pub fn record_poll(readings: usize, fresh: usize) {
    counter!("tilt_forwarder_polls_total").increment(1);
    gauge!("tilt_forwarder_readings").set(readings as f64);
    gauge!("tilt_forwarder_fresh_readings").set(fresh as f64);
}

/// 记录快照读取失败
pub fn record_snapshot_error() {
    counter!("tilt_forwarder_snapshot_errors_total").increment(1);
}

/// 记录一次分发耗时
pub fn record_dispatch_duration(duration: Duration) {
    histogram!("tilt_forwarder_dispatch_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// 单个 target 的累计计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetTotals {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub empty: u64,
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// poll 次数
    pub total_polls: u64,

    /// 快照读取失败次数
    pub snapshot_errors: u64,

    /// 各 target 计数
    pub targets: BTreeMap<String, TargetTotals>,

    /// 分发耗时统计 (毫秒)
    pub dispatch_stats: RunningStats,

    /// 每次 poll 的新鲜读数数量
    pub fresh_stats: RunningStats,
}

impl DispatchMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 poll
    pub fn record_poll(&mut self, fresh: usize, dispatch_duration: Duration) {
        self.total_polls += 1;
        self.fresh_stats.push(fresh as f64);
        self.dispatch_stats
            .push(dispatch_duration.as_secs_f64() * 1000.0);
    }

    pub fn record_snapshot_error(&mut self) {
        self.snapshot_errors += 1;
    }

    /// 累加单个 target 的结果
    pub fn update(&mut self, target: &str, outcome: &DispatchOutcome) {
        let totals = self.targets.entry(target.to_string()).or_default();
        match outcome {
            DispatchOutcome::Skipped(_) => totals.skipped += 1,
            DispatchOutcome::Empty => totals.empty += 1,
            DispatchOutcome::Sent {
                attempted,
                succeeded,
            } => {
                totals.attempted += *attempted as u64;
                totals.succeeded += *succeeded as u64;
                totals.failed += outcome.failed() as u64;
            }
            DispatchOutcome::Faulted(_) => totals.failed += 1,
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let attempted: u64 = self.targets.values().map(|t| t.attempted).sum();
        let succeeded: u64 = self.targets.values().map(|t| t.succeeded).sum();
        MetricsSummary {
            total_polls: self.total_polls,
            snapshot_errors: self.snapshot_errors,
            total_attempted: attempted,
            total_succeeded: succeeded,
            success_rate: if attempted > 0 {
                succeeded as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            dispatch_ms: StatsSummary::from(&self.dispatch_stats),
            fresh_readings: StatsSummary::from(&self.fresh_stats),
            targets: self.targets.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_polls: u64,
    pub snapshot_errors: u64,
    pub total_attempted: u64,
    pub total_succeeded: u64,
    pub success_rate: f64,
    pub dispatch_ms: StatsSummary,
    pub fresh_readings: StatsSummary,
    pub targets: BTreeMap<String, TargetTotals>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Total polls: {}", self.total_polls)?;
        writeln!(f, "Snapshot errors: {}", self.snapshot_errors)?;
        writeln!(
            f,
            "Requests: {} attempted, {} succeeded ({:.2}%)",
            self.total_attempted, self.total_succeeded, self.success_rate
        )?;
        writeln!(f, "Dispatch time (ms): {}", self.dispatch_ms)?;
        writeln!(f, "Fresh readings per poll: {}", self.fresh_readings)?;

        if !self.targets.is_empty() {
            writeln!(f, "Targets:")?;
            for (name, t) in &self.targets {
                writeln!(
                    f,
                    "  {}: attempted={} succeeded={} failed={} skipped={} empty={}",
                    name, t.attempted, t.succeeded, t.failed, t.skipped, t.empty
                )?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
