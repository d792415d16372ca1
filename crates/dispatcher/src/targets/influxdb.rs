//! InfluxDB v2 target
//!
//! One line-protocol write per eligible reading, with derived brewing
//! metrics. Any 2xx status counts as success.

use std::time::Duration;

use chrono::Utc;
use contracts::{
    ContractError, DataTarget, DispatchOutcome, ForwarderConfig, InfluxDbEndpoint,
    ReadingSnapshot, TargetStatus,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use super::common::TargetCore;
use crate::payload::InfluxRecord;
use crate::transport::{HttpTransport, OutboundRequest, ReqwestTransport};

pub const DEFAULT_INFLUXDB_INTERVAL: Duration = Duration::from_secs(15);

/// Time-series target writing through the InfluxDB v2 HTTP API
pub struct InfluxDbTarget<T = ReqwestTransport> {
    core: TargetCore<InfluxDbEndpoint>,
    transport: T,
}

impl<T: HttpTransport> InfluxDbTarget<T> {
    pub const NAME: &'static str = "influxdb";

    pub fn new(transport: T) -> Self {
        Self {
            core: TargetCore::new(Self::NAME, DEFAULT_INFLUXDB_INTERVAL),
            transport,
        }
    }

    pub fn status(&self) -> &TargetStatus {
        self.core.status()
    }

    pub fn endpoint(&self) -> Option<&InfluxDbEndpoint> {
        self.core.endpoint()
    }
}

impl<T: HttpTransport + Sync> DataTarget for InfluxDbTarget<T> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn load_config(&mut self, config: &ForwarderConfig) -> TargetStatus {
        let settings = &config.influxdb;
        self.core
            .configure(settings.enabled, InfluxDbEndpoint::try_from(settings))
    }

    fn send_interval(&self) -> Duration {
        self.core.send_interval()
    }

    #[instrument(name = "influxdb_process", skip_all, fields(readings = snapshot.len()))]
    async fn process(&mut self, snapshot: &ReadingSnapshot) -> DispatchOutcome {
        let now = Instant::now();
        let endpoint = match self.core.preflight(now) {
            Ok(endpoint) => endpoint,
            Err(reason) => return DispatchOutcome::Skipped(reason),
        };

        let batch = snapshot.eligible(&endpoint.filter);
        if batch.is_empty() {
            debug!("No fresh readings to write");
            self.core.mark_attempt(now);
            return DispatchOutcome::Empty;
        }

        let attempted = batch.len();
        let mut succeeded = 0;
        let authorization = format!("Token {}", endpoint.token);

        for reading in batch {
            let record = InfluxRecord::from_reading(
                reading,
                &endpoint.beer_name,
                endpoint.original_gravity,
                Utc::now(),
            );
            let request = OutboundRequest::text(
                Self::NAME,
                endpoint.write_url.clone(),
                record.to_line_protocol(),
            )
            .with_header("Authorization", authorization.as_str());

            match self.transport.send(request).await.and_then(|response| {
                response.accept_if(Self::NAME, |status| (200..300).contains(&status))
            }) {
                Ok(_) => succeeded += 1,
                Err(ContractError::RemoteRejection { status, body, .. }) => {
                    let body = if body.is_empty() {
                        "No response received"
                    } else {
                        body.as_str()
                    };
                    error!(
                        color = %reading.color,
                        status,
                        body = %body,
                        "Error sending data to InfluxDB"
                    );
                }
                Err(e) => {
                    error!(color = %reading.color, error = %e, "InfluxDB unreachable");
                }
            }
        }

        if succeeded > 0 {
            info!(count = succeeded, "Sent {} Tilt(s) to InfluxDB", succeeded);
        }

        self.core.mark_attempt(now);
        DispatchOutcome::Sent {
            attempted,
            succeeded,
        }
    }
}
