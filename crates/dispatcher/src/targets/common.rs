//! State shared by every target: enable flag, validated endpoint, cadence

use std::time::Duration;

use contracts::{
    ContractError, InfluxDbEndpoint, LegacyEndpoint, SkipReason, TargetStatus,
    VendorCloudEndpoint,
};
use tokio::time::Instant;
use tracing::{error, info};

use crate::cadence::CadenceGate;

/// Validated endpoint of one target kind
pub(crate) trait Endpoint: Clone {
    /// Configured send interval
    fn send_interval(&self) -> Duration;

    /// Short description for logs
    fn describe(&self) -> String;
}

impl Endpoint for LegacyEndpoint {
    fn send_interval(&self) -> Duration {
        self.send_interval
    }

    fn describe(&self) -> String {
        format!("url={} color={}", self.url, self.filter)
    }
}

impl Endpoint for VendorCloudEndpoint {
    fn send_interval(&self) -> Duration {
        self.send_interval
    }

    fn describe(&self) -> String {
        format!("url={} color={}", self.url, self.filter)
    }
}

impl Endpoint for InfluxDbEndpoint {
    fn send_interval(&self) -> Duration {
        self.send_interval
    }

    fn describe(&self) -> String {
        format!(
            "org={} bucket={} beer={} color={}",
            self.org, self.bucket, self.beer_name, self.filter
        )
    }
}

pub(crate) struct TargetCore<E> {
    name: &'static str,
    enabled: bool,
    endpoint: Option<E>,
    status: TargetStatus,
    gate: CadenceGate,
    /// Interval last taken from configuration; a reload with the same value
    /// keeps any server-provided override
    configured_interval: Duration,
}

impl<E: Endpoint> TargetCore<E> {
    /// Disabled, with the first cadence window starting now
    pub(crate) fn new(name: &'static str, default_interval: Duration) -> Self {
        Self {
            name,
            enabled: false,
            endpoint: None,
            status: TargetStatus::Disabled,
            gate: CadenceGate::new(default_interval),
            configured_interval: default_interval,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn status(&self) -> &TargetStatus {
        &self.status
    }

    pub(crate) fn endpoint(&self) -> Option<&E> {
        self.endpoint.as_ref()
    }

    pub(crate) fn send_interval(&self) -> Duration {
        self.gate.interval()
    }

    pub(crate) fn gate_mut(&mut self) -> &mut CadenceGate {
        &mut self.gate
    }

    /// Apply freshly validated settings
    pub(crate) fn configure(
        &mut self,
        enabled: bool,
        endpoint: Result<E, ContractError>,
    ) -> TargetStatus {
        self.enabled = enabled;

        self.status = match (enabled, endpoint) {
            (false, _) => {
                self.endpoint = None;
                info!(target_name = self.name, "Target is disabled");
                TargetStatus::Disabled
            }
            (true, Err(e)) => {
                self.endpoint = None;
                error!(
                    target_name = self.name,
                    error = %e,
                    "Target is enabled, but its configuration is invalid"
                );
                TargetStatus::Misconfigured(e.to_string())
            }
            (true, Ok(endpoint)) => {
                let interval = endpoint.send_interval();
                if interval != self.configured_interval {
                    self.gate.set_interval(interval);
                    self.configured_interval = interval;
                }
                info!(
                    target_name = self.name,
                    endpoint = %endpoint.describe(),
                    interval_ms = self.gate.interval().as_millis() as u64,
                    "Target is enabled"
                );
                self.endpoint = Some(endpoint);
                TargetStatus::Ready
            }
        };

        self.status.clone()
    }

    /// Gate checks before touching the network; hands back the endpoint
    pub(crate) fn preflight(&self, now: Instant) -> Result<E, SkipReason> {
        if !self.enabled {
            return Err(SkipReason::Disabled);
        }
        let endpoint = self.endpoint.as_ref().ok_or(SkipReason::Misconfigured)?;
        if !self.gate.is_due(now) {
            return Err(SkipReason::NotDue);
        }
        Ok(endpoint.clone())
    }

    /// Record an attempt started at `started`; called once the gate has
    /// opened, whatever the attempt's result
    pub(crate) fn mark_attempt(&mut self, started: Instant) {
        self.gate.mark_sent(started);
    }
}
