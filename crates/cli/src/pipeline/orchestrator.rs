//! Forwarder poll loop - coordinates snapshot, dispatch and reload.
//!
//! Each tick reads a fresh snapshot and hands it to the dispatch handler.
//! SIGHUP re-reads the configuration; a broken reload keeps the previous one.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use config_loader::ConfigLoader;
use contracts::{ContractError, ForwarderConfig, SnapshotProvider};
use dispatcher::DispatchHandler;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{FileSnapshotProvider, ForwarderStats};
use crate::error::Result;

/// Smallest poll period handed to the ticker
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Forwarder run options
#[derive(Debug, Clone, Default)]
pub struct ForwarderOptions {
    /// Configuration file re-read on reload (environment only if None)
    pub config_path: Option<PathBuf>,

    /// Maximum number of poll ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Reload the configuration on SIGHUP
    pub reload_on_hangup: bool,
}

/// Poll loop driving a [`DispatchHandler`]
pub struct Forwarder {
    handler: DispatchHandler,
    provider: FileSnapshotProvider,
    config: ForwarderConfig,
    options: ForwarderOptions,
}

impl Forwarder {
    pub fn new(
        handler: DispatchHandler,
        provider: FileSnapshotProvider,
        config: ForwarderConfig,
        options: ForwarderOptions,
    ) -> Self {
        Self {
            handler,
            provider,
            config,
            options,
        }
    }

    /// Standard targets over `reqwest`, readings from `readings_path`
    pub fn from_config(
        config: ForwarderConfig,
        readings_path: impl Into<PathBuf>,
        options: ForwarderOptions,
    ) -> Result<Self> {
        let handler = DispatchHandler::from_config(&config)?;
        let provider = FileSnapshotProvider::new(readings_path, config.poll.max_age()?);
        Ok(Self::new(handler, provider, config, options))
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Swap in `config`; returns whether the poll interval changed
    ///
    /// Targets keep their send windows, only changed intervals are reset.
    pub fn apply_config(&mut self, config: ForwarderConfig) -> Result<bool> {
        config.poll.interval()?;
        let max_age = config.poll.max_age()?;
        let poll_changed = config.poll.interval_secs != self.config.poll.interval_secs;

        self.handler.load_config(&config);
        self.provider.set_max_age(max_age);
        self.config = config;
        Ok(poll_changed)
    }

    /// Re-read file and environment, then [`apply_config`](Self::apply_config)
    pub async fn reload(&mut self) -> Result<bool> {
        let content = match self.options.config_path.as_deref() {
            Some(path) => {
                let format = ConfigLoader::detect_format(path)?;
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(ContractError::from)?;
                Some((content, format))
            }
            None => None,
        };

        let config = ConfigLoader::load_content(
            content.as_ref().map(|(content, format)| (content.as_str(), *format)),
            &config_loader::env::process_env(),
        )?;
        self.apply_config(config)
    }

    /// Run until cancelled or `max_ticks` is reached
    pub async fn run(mut self, cancel: CancellationToken) -> Result<ForwarderStats> {
        let start_time = Instant::now();
        let mut stats = ForwarderStats::default();
        let mut ticker = poll_ticker(self.config.poll.interval()?);
        let mut hangup = Hangup::install(self.options.reload_on_hangup);

        info!(
            targets = ?self.handler.names(),
            readings = %self.provider.path().display(),
            poll_interval_secs = self.config.poll.interval_secs,
            "Poll loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }

                _ = hangup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    match self.reload().await {
                        Ok(poll_changed) => {
                            stats.reloads += 1;
                            if poll_changed {
                                ticker = poll_ticker(self.config.poll.interval()?);
                                info!(
                                    poll_interval_secs = self.config.poll.interval_secs,
                                    "Poll interval changed"
                                );
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Configuration reload failed, keeping previous configuration");
                        }
                    }
                }

                _ = ticker.tick() => {
                    if !self.poll_once(&cancel, &mut stats).await {
                        break;
                    }

                    if let Some(max) = self.options.max_ticks {
                        if stats.ticks >= max {
                            info!(max_ticks = max, "Reached max ticks limit");
                            break;
                        }
                    }
                }
            }
        }

        stats.duration = start_time.elapsed();
        stats.targets = self.handler.metrics();
        Ok(stats)
    }

    /// One snapshot + dispatch; false once shutdown interrupted the dispatch
    async fn poll_once(&mut self, cancel: &CancellationToken, stats: &mut ForwarderStats) -> bool {
        stats.ticks += 1;

        let snapshot = match self.provider.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.provider.path().display(),
                    "Failed to read readings snapshot"
                );
                stats.snapshot_errors += 1;
                stats.dispatch_metrics.record_snapshot_error();
                observability::record_snapshot_error();
                return true;
            }
        };

        let fresh = snapshot.fresh().count();
        let started = Instant::now();
        let report = match self.handler.dispatch_until(&snapshot, cancel).await {
            Ok(report) => report,
            Err(e) => {
                debug!(error = %e, "Dispatch abandoned");
                return false;
            }
        };
        let elapsed = started.elapsed();

        for (name, outcome) in &report.outcomes {
            observability::record_dispatch(name, outcome);
            stats.dispatch_metrics.update(name, outcome);
        }
        for (name, metrics) in self.handler.metrics() {
            observability::record_send_interval(&name, Duration::from_millis(metrics.interval_ms));
        }
        observability::record_poll(snapshot.len(), fresh);
        observability::record_dispatch_duration(elapsed);
        stats.dispatch_metrics.record_poll(fresh, elapsed);

        true
    }
}

fn poll_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// SIGHUP listener; never fires when disabled or unsupported
struct Hangup {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl Hangup {
    #[cfg(unix)]
    fn install(enabled: bool) -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        if !enabled {
            return Self { signal: None };
        }
        match signal(SignalKind::hangup()) {
            Ok(signal) => Self {
                signal: Some(signal),
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGHUP handler, reload disabled");
                Self { signal: None }
            }
        }
    }

    #[cfg(not(unix))]
    fn install(_enabled: bool) -> Self {
        Self {}
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        {
            if let Some(signal) = self.signal.as_mut() {
                if signal.recv().await.is_some() {
                    return;
                }
                self.signal = None;
            }
        }
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use contracts::{DataTarget, DispatchOutcome, ReadingSnapshot, TargetStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts the fresh readings it is offered
    struct CountingTarget {
        seen: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl DataTarget for CountingTarget {
        fn name(&self) -> &str {
            "counting"
        }

        fn load_config(&mut self, _config: &ForwarderConfig) -> TargetStatus {
            TargetStatus::Ready
        }

        fn send_interval(&self) -> Duration {
            Duration::from_secs(3)
        }

        async fn process(&mut self, snapshot: &ReadingSnapshot) -> DispatchOutcome {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let fresh = snapshot.fresh().count();
            self.seen.fetch_add(fresh, Ordering::SeqCst);
            DispatchOutcome::Sent {
                attempted: fresh,
                succeeded: fresh,
            }
        }
    }

    fn fast_config() -> ForwarderConfig {
        let mut config = ForwarderConfig::default();
        config.poll.interval_secs = 0.01;
        config
    }

    fn readings_file(ages_secs: &[(&str, i64)]) -> tempfile::NamedTempFile {
        let now = Utc::now();
        let readings: Vec<_> = ages_secs
            .iter()
            .map(|(color, age)| {
                serde_json::json!({
                    "color": color,
                    "smoothed_gravity": 1.012,
                    "smoothed_temp": 68.0,
                    "last_seen": (now - ChronoDuration::seconds(*age)).to_rfc3339(),
                })
            })
            .collect();
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), serde_json::to_string(&readings).unwrap()).unwrap();
        file
    }

    fn forwarder(
        path: &std::path::Path,
        seen: Arc<AtomicUsize>,
        delay: Duration,
        max_ticks: Option<u64>,
    ) -> Forwarder {
        let config = fast_config();
        let handler = DispatchHandler::new().with_target(CountingTarget { seen, delay });
        let provider = FileSnapshotProvider::new(path, config.poll.max_age().unwrap());
        Forwarder::new(
            handler,
            provider,
            config,
            ForwarderOptions {
                max_ticks,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_stops_after_max_ticks() {
        let file = readings_file(&[("Red", 1), ("Blue", 2), ("Green", 900)]);
        let seen = Arc::new(AtomicUsize::new(0));

        let stats = forwarder(file.path(), seen.clone(), Duration::ZERO, Some(3))
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.snapshot_errors, 0);
        // the expired Green reading is never offered
        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert_eq!(stats.requests_attempted(), 6);
        assert_eq!(stats.dispatch_metrics.total_polls, 3);
    }

    #[tokio::test]
    async fn test_missing_readings_file_keeps_polling() {
        let seen = Arc::new(AtomicUsize::new(0));
        let stats = forwarder(
            std::path::Path::new("/nonexistent/readings.json"),
            seen.clone(),
            Duration::ZERO,
            Some(2),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.snapshot_errors, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_slow_dispatch() {
        let file = readings_file(&[("Red", 1)]);
        let seen = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let run = tokio::spawn(
            forwarder(file.path(), seen.clone(), Duration::from_secs(60), None).run(cancel.clone()),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.ticks, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_apply_config_reports_poll_change() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut forwarder = forwarder(
            std::path::Path::new("readings.json"),
            seen,
            Duration::ZERO,
            None,
        );

        assert!(!forwarder.apply_config(fast_config()).unwrap());

        let mut slower = fast_config();
        slower.poll.interval_secs = 2.0;
        assert!(forwarder.apply_config(slower).unwrap());
        assert_eq!(forwarder.config().poll.interval_secs, 2.0);
    }

    #[tokio::test]
    async fn test_reload_reads_config_file() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut forwarder = forwarder(
            std::path::Path::new("readings.json"),
            seen,
            Duration::ZERO,
            None,
        );
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::fs::write(file.path(), "[poll]\ninterval_secs = 2.0\nmax_age_secs = 60.0\n").unwrap();
        forwarder.options.config_path = Some(file.path().to_path_buf());

        assert!(forwarder.reload().await.unwrap());
        assert_eq!(forwarder.config().poll.max_age_secs, 60.0);

        std::fs::write(file.path(), "[poll]\ninterval_secs = 1e20\n").unwrap();
        assert!(forwarder.reload().await.is_err());
        assert_eq!(forwarder.config().poll.interval_secs, 2.0);
    }

    #[test]
    fn test_apply_invalid_config_keeps_previous() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut forwarder = forwarder(
            std::path::Path::new("readings.json"),
            seen,
            Duration::ZERO,
            None,
        );

        let mut broken = fast_config();
        broken.poll.max_age_secs = 0.0;
        assert!(forwarder.apply_config(broken).is_err());
        assert_eq!(forwarder.config().poll.max_age_secs, 300.0);
    }
}
