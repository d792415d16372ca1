//! # Dispatcher
//!
//! Forwards reading snapshots to the telemetry targets.
//!
//! Responsibilities:
//! - Gate each target on its own send interval
//! - Shape readings into each target's wire format
//! - Isolate targets from each other's failures

pub mod cadence;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod payload;
pub mod targets;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cadence::CadenceGate;
pub use contracts::{DataTarget, DispatchOutcome, ReadingSnapshot};
pub use dispatcher::{DispatchHandler, DispatchReport};
pub use error::DispatcherError;
pub use handle::TargetHandle;
pub use metrics::{MetricsSnapshot, TargetMetrics};
pub use targets::{InfluxDbTarget, LegacyHttpTarget, VendorCloudTarget};
pub use transport::{HttpResponse, HttpTransport, OutboundRequest, ReqwestTransport};
