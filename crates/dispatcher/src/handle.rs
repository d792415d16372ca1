//! TargetHandle - owns one target plus its metrics, contains its faults

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error, instrument};

use contracts::{DataTarget, DispatchOutcome, ForwarderConfig, ReadingSnapshot, TargetStatus};

use crate::metrics::TargetMetrics;

/// Object-safe view of a [`DataTarget`]
trait ErasedTarget: Send {
    fn name(&self) -> &str;
    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus;
    fn send_interval(&self) -> Duration;
    fn process<'a>(&'a mut self, snapshot: &'a ReadingSnapshot) -> BoxFuture<'a, DispatchOutcome>;
}

impl<T: DataTarget + Send> ErasedTarget for T {
    fn name(&self) -> &str {
        DataTarget::name(self)
    }

    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus {
        DataTarget::load_config(self, config)
    }

    fn send_interval(&self) -> Duration {
        DataTarget::send_interval(self)
    }

    fn process<'a>(&'a mut self, snapshot: &'a ReadingSnapshot) -> BoxFuture<'a, DispatchOutcome> {
        Box::pin(DataTarget::process(self, snapshot))
    }
}

/// Handle to one registered target
pub struct TargetHandle {
    name: String,
    target: Box<dyn ErasedTarget>,
    metrics: Arc<TargetMetrics>,
    status: TargetStatus,
}

impl TargetHandle {
    pub fn new<T: DataTarget + Send + 'static>(target: T) -> Self {
        let name = DataTarget::name(&target).to_string();
        let metrics = Arc::new(TargetMetrics::new());
        metrics.set_interval(DataTarget::send_interval(&target));

        Self {
            name,
            target: Box::new(target),
            metrics,
            status: TargetStatus::Disabled,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<TargetMetrics> {
        &self.metrics
    }

    /// Status from the last `load_config`
    pub fn status(&self) -> &TargetStatus {
        &self.status
    }

    pub fn send_interval(&self) -> Duration {
        self.target.send_interval()
    }

    pub fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus {
        self.status = self.target.load_config(config);
        self.metrics.set_interval(self.target.send_interval());
        self.status.clone()
    }

    /// Run one `process` call; a panic inside the target becomes
    /// [`DispatchOutcome::Faulted`]
    #[instrument(name = "target_handle_process", skip_all, fields(target_name = %self.name))]
    pub async fn process(&mut self, snapshot: &ReadingSnapshot) -> DispatchOutcome {
        let outcome = match AssertUnwindSafe(self.target.process(snapshot))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(target_name = %self.name, panic = %message, "Target panicked during process");
                DispatchOutcome::Faulted(message)
            }
        };

        self.metrics.record(&outcome);
        self.metrics.set_interval(self.target.send_interval());
        debug!(target_name = %self.name, outcome = ?outcome, "Target processed");
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{reading, snapshot};
    use chrono::Utc;
    use contracts::SkipReason;

    /// Target scripted from the test body
    pub(crate) struct ScriptedTarget {
        pub name: &'static str,
        pub outcome: DispatchOutcome,
        pub panics: bool,
        pub delay: Duration,
        pub interval: Duration,
    }

    impl ScriptedTarget {
        pub fn new(name: &'static str, outcome: DispatchOutcome) -> Self {
            Self {
                name,
                outcome,
                panics: false,
                delay: Duration::ZERO,
                interval: Duration::from_secs(3),
            }
        }
    }

    impl DataTarget for ScriptedTarget {
        fn name(&self) -> &str {
            self.name
        }

        fn load_config(&mut self, _config: &ForwarderConfig) -> TargetStatus {
            TargetStatus::Ready
        }

        fn send_interval(&self) -> Duration {
            self.interval
        }

        async fn process(&mut self, _snapshot: &ReadingSnapshot) -> DispatchOutcome {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panics {
                panic!("{} exploded", self.name);
            }
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn test_handle_records_metrics() {
        let target = ScriptedTarget::new(
            "scripted",
            DispatchOutcome::Sent {
                attempted: 2,
                succeeded: 1,
            },
        );
        let mut handle = TargetHandle::new(target);
        assert_eq!(handle.load_config(&ForwarderConfig::default()), TargetStatus::Ready);

        let now = Utc::now();
        handle.process(&snapshot(now, [reading("Red", now, 1)])).await;

        let metrics = handle.metrics().snapshot();
        assert_eq!(metrics.attempt_count, 2);
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.interval_ms, 3_000);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut target =
            ScriptedTarget::new("exploding", DispatchOutcome::Skipped(SkipReason::NotDue));
        target.panics = true;
        let mut handle = TargetHandle::new(target);

        let outcome = handle.process(&ReadingSnapshot::default()).await;

        assert_eq!(outcome, DispatchOutcome::Faulted("exploding exploded".into()));
        assert_eq!(handle.metrics().failure_count(), 1);
    }
}
