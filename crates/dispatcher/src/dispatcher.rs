//! DispatchHandler - fans one snapshot out to every registered target

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use contracts::{DataTarget, DispatchOutcome, ForwarderConfig, ReadingSnapshot, TargetStatus};

use crate::error::DispatcherError;
use crate::handle::TargetHandle;
use crate::metrics::MetricsSnapshot;
use crate::targets::{InfluxDbTarget, LegacyHttpTarget, VendorCloudTarget};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Per-target outcomes of one dispatch, in registration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub outcomes: Vec<(String, DispatchOutcome)>,
}

impl DispatchReport {
    pub fn get(&self, name: &str) -> Option<&DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// Requests attempted across all targets
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                DispatchOutcome::Sent { attempted, .. } => *attempted,
                _ => 0,
            })
            .sum()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                DispatchOutcome::Sent { succeeded, .. } => *succeeded,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().map(|(_, outcome)| outcome.failed()).sum()
    }
}

/// Fixed, ordered set of targets driven by the poll loop
#[derive(Default)]
pub struct DispatchHandler {
    handles: Vec<TargetHandle>,
}

impl DispatchHandler {
    /// Empty handler; add targets with [`register`](Self::register)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard target set over a shared `reqwest` client and
    /// apply `config`
    #[instrument(name = "dispatch_handler_from_config", skip_all)]
    pub fn from_config(config: &ForwarderConfig) -> Result<Self, DispatcherError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(transport, config))
    }

    /// Standard target set over any transport
    pub fn with_transport<T>(transport: T, config: &ForwarderConfig) -> Self
    where
        T: HttpTransport + Clone + Send + Sync + 'static,
    {
        let mut handler = Self::new()
            .with_target(LegacyHttpTarget::new(transport.clone()))
            .with_target(VendorCloudTarget::new(transport.clone()))
            .with_target(InfluxDbTarget::new(transport));
        handler.load_config(config);
        handler
    }

    pub fn with_target<T: DataTarget + Send + 'static>(mut self, target: T) -> Self {
        self.register(target);
        self
    }

    pub fn register<T: DataTarget + Send + 'static>(&mut self, target: T) {
        let handle = TargetHandle::new(target);
        debug!(target_name = %handle.name(), "Target registered");
        self.handles.push(handle);
    }

    /// Apply `config` to every target; safe to call again on reload
    #[instrument(name = "dispatch_handler_load_config", skip_all, fields(targets = self.handles.len()))]
    pub fn load_config(&mut self, config: &ForwarderConfig) -> Vec<(String, TargetStatus)> {
        let statuses: Vec<_> = self
            .handles
            .iter_mut()
            .map(|handle| (handle.name().to_string(), handle.load_config(config)))
            .collect();

        let ready = statuses.iter().filter(|(_, s)| s.is_ready()).count();
        info!(ready, total = statuses.len(), "Target configuration applied");
        statuses
    }

    /// Give every target a chance to send `snapshot`
    ///
    /// Targets run concurrently; a failing or panicking target does not
    /// affect the others.
    #[instrument(
        name = "dispatch_handler_dispatch",
        skip_all,
        fields(targets = self.handles.len(), readings = snapshot.len())
    )]
    pub async fn dispatch(&mut self, snapshot: &ReadingSnapshot) -> DispatchReport {
        let outcomes = join_all(
            self.handles
                .iter_mut()
                .map(|handle| handle.process(snapshot)),
        )
        .await;

        let report = DispatchReport {
            outcomes: self
                .handles
                .iter()
                .map(|handle| handle.name().to_string())
                .zip(outcomes)
                .collect(),
        };

        if report.attempted() > 0 {
            debug!(
                attempted = report.attempted(),
                succeeded = report.succeeded(),
                "Dispatch complete"
            );
        }
        report
    }

    /// Like [`dispatch`](Self::dispatch), abandoned when `cancel` fires
    pub async fn dispatch_until(
        &mut self,
        snapshot: &ReadingSnapshot,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, DispatcherError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Dispatch cancelled by shutdown");
                Err(DispatcherError::Cancelled)
            }
            report = self.dispatch(snapshot) => Ok(report),
        }
    }

    /// Metrics for all targets
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    pub fn statuses(&self) -> Vec<(String, TargetStatus)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.status().clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
