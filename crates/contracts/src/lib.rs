//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Reading freshness uses wall-clock UTC (`chrono`), evaluated at snapshot capture
//! - Send cadence is owned by each target and uses a monotonic clock

mod color;
mod error;
mod reading;
mod settings;
mod snapshot_source;
mod target;

pub use color::{ColorFilter, TiltColor};
pub use error::*;
pub use reading::*;
pub use settings::*;
pub use snapshot_source::{LocalSnapshotProvider, SnapshotProvider};
pub use target::*;
