//! Legacy HTTP target
//!
//! Posts every eligible reading in one JSON batch:
//! `{"tilts": [...], "tiltbridge_junior": true}`. Only HTTP 200 counts as
//! success.

use std::time::Duration;

use contracts::{
    ContractError, DataTarget, DispatchOutcome, ForwarderConfig, LegacyEndpoint, ReadingSnapshot,
    TargetStatus,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use super::common::TargetCore;
use crate::payload::LegacyPayload;
use crate::transport::{HttpTransport, OutboundRequest, ReqwestTransport};

/// Default time between two batches
pub const DEFAULT_LEGACY_INTERVAL: Duration = Duration::from_secs(3);

/// Batched JSON target for the legacy endpoint
pub struct LegacyHttpTarget<T = ReqwestTransport> {
    core: TargetCore<LegacyEndpoint>,
    transport: T,
}

impl<T: HttpTransport> LegacyHttpTarget<T> {
    pub const NAME: &'static str = "legacy_http";

    /// Create a disabled target; call `load_config` to enable it
    pub fn new(transport: T) -> Self {
        Self {
            core: TargetCore::new(Self::NAME, DEFAULT_LEGACY_INTERVAL),
            transport,
        }
    }

    pub fn status(&self) -> &TargetStatus {
        self.core.status()
    }

    pub fn endpoint(&self) -> Option<&LegacyEndpoint> {
        self.core.endpoint()
    }
}

impl<T: HttpTransport + Sync> DataTarget for LegacyHttpTarget<T> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus {
        let settings = &config.legacy;
        self.core
            .configure(settings.enabled, LegacyEndpoint::try_from(settings))
    }

    fn send_interval(&self) -> Duration {
        self.core.send_interval()
    }

    #[instrument(name = "legacy_http_process", skip_all, fields(readings = snapshot.len()))]
    async fn process(&mut self, snapshot: &ReadingSnapshot) -> DispatchOutcome {
        let now = Instant::now();
        let endpoint = match self.core.preflight(now) {
            Ok(endpoint) => endpoint,
            Err(reason) => return DispatchOutcome::Skipped(reason),
        };

        let batch = snapshot.eligible(&endpoint.filter);
        if batch.is_empty() {
            debug!("No fresh readings to send");
            self.core.mark_attempt(now);
            return DispatchOutcome::Empty;
        }

        let count = batch.len();
        let request = OutboundRequest::json(Self::NAME, endpoint.url, &LegacyPayload::new(batch));

        let succeeded = match request {
            Ok(request) => match self
                .transport
                .send(request)
                .await
                .and_then(|response| response.accept_if(Self::NAME, |status| status == 200))
            {
                Ok(_) => {
                    info!(count, "Sent {} Tilt(s) to legacy endpoint", count);
                    1
                }
                Err(e @ ContractError::RemoteRejection { .. }) => {
                    error!(error = %e, "Error sending data to legacy endpoint");
                    0
                }
                Err(e) => {
                    error!(error = %e, "Legacy endpoint unreachable");
                    0
                }
            },
            Err(e) => {
                error!(error = %e, "Failed to encode legacy batch");
                0
            }
        };

        self.core.mark_attempt(now);
        DispatchOutcome::Sent {
            attempted: 1,
            succeeded,
        }
    }
}
