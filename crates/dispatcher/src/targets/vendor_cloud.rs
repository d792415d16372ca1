//! Vendor cloud target
//!
//! One JSON POST per eligible reading. A 200 response may carry
//! `next_request_ms`; a positive value becomes the new send interval.

use std::time::Duration;

use contracts::{
    ContractError, DataTarget, DispatchOutcome, ForwarderConfig, ReadingSnapshot, TargetStatus,
    VendorCloudEndpoint,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::common::TargetCore;
use crate::payload::VendorCloudPayload;
use crate::transport::{HttpTransport, OutboundRequest, ReqwestTransport};

/// Default time between two cycles, until the service says otherwise
pub const DEFAULT_VENDOR_INTERVAL: Duration = Duration::from_secs(3);

const TARGET_NAME: &str = "vendor_cloud";

#[derive(Debug, Deserialize)]
struct VendorCloudResponse {
    #[serde(default)]
    next_request_ms: Option<i64>,
}

/// Extract the interval hint from a success body
///
/// `Ok(None)` when the field is absent or null.
fn parse_interval_hint(body: &str) -> Result<Option<i64>, ContractError> {
    serde_json::from_str::<VendorCloudResponse>(body)
        .map(|response| response.next_request_ms)
        .map_err(|e| ContractError::malformed_response(TARGET_NAME, e.to_string()))
}

/// Per-reading target for the vendor cloud API
pub struct VendorCloudTarget<T = ReqwestTransport> {
    core: TargetCore<VendorCloudEndpoint>,
    transport: T,
}

impl<T: HttpTransport> VendorCloudTarget<T> {
    pub const NAME: &'static str = TARGET_NAME;

    pub fn new(transport: T) -> Self {
        Self {
            core: TargetCore::new(Self::NAME, DEFAULT_VENDOR_INTERVAL),
            transport,
        }
    }

    pub fn status(&self) -> &TargetStatus {
        self.core.status()
    }

    pub fn endpoint(&self) -> Option<&VendorCloudEndpoint> {
        self.core.endpoint()
    }
}

impl<T: HttpTransport + Sync> DataTarget for VendorCloudTarget<T> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus {
        let settings = &config.vendor_cloud;
        self.core
            .configure(settings.enabled, VendorCloudEndpoint::try_from(settings))
    }

    fn send_interval(&self) -> Duration {
        self.core.send_interval()
    }

    #[instrument(name = "vendor_cloud_process", skip_all, fields(readings = snapshot.len()))]
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

        let attempted = batch.len();
        let mut succeeded = 0;
        let mut hint = None;

        for reading in batch {
            let payload =
                VendorCloudPayload::from_reading(reading, &endpoint.api_key, endpoint.tilt_angle);
            let request = match OutboundRequest::json(Self::NAME, endpoint.url.clone(), &payload) {
                Ok(request) => request,
                Err(e) => {
                    error!(color = %reading.color, error = %e, "Failed to encode reading");
                    continue;
                }
            };

            match self
                .transport
                .send(request)
                .await
                .and_then(|response| response.accept_if(Self::NAME, |status| status == 200))
            {
                Ok(response) => {
                    succeeded += 1;
                    match parse_interval_hint(&response.body) {
                        Ok(Some(ms)) => hint = Some(ms),
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Ignoring unreadable vendor cloud response"),
                    }
                }
                Err(e @ ContractError::RemoteRejection { .. }) => {
                    error!(color = %reading.color, error = %e, "Error sending data to vendor cloud");
                }
                Err(e) => {
                    error!(color = %reading.color, error = %e, "Vendor cloud unreachable");
                }
            }
        }

        if let Some(ms) = hint {
            let gate = self.core.gate_mut();
            if gate.apply_hint_ms(ms) {
                debug!(next_request_ms = ms, "Send interval updated by vendor cloud");
            } else {
                debug!(next_request_ms = ms, "Ignoring non-positive interval hint");
            }
        }

        if succeeded > 0 {
            info!(
                count = succeeded,
                next_send_ms = self.core.send_interval().as_millis() as u64,
                "Sent {} Tilt(s) to vendor cloud",
                succeeded
            );
        }

        self.core.mark_attempt(now);
        DispatchOutcome::Sent {
            attempted,
            succeeded,
        }
    }
}
