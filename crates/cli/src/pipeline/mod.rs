//! Forwarder poll loop and its inputs.

mod orchestrator;
mod snapshot;
mod stats;

pub use orchestrator::{Forwarder, ForwarderOptions};
pub use snapshot::FileSnapshotProvider;
pub use stats::ForwarderStats;
