//! SnapshotProvider trait - reading store abstraction
//!
//! The reading store lives outside the dispatch core; the poll loop asks it
//! for a fresh snapshot once per tick.

use crate::{ContractError, ReadingSnapshot};

/// Source of reading snapshots
#[trait_variant::make(SnapshotProvider: Send)]
pub trait LocalSnapshotProvider {
    /// Capture the current color -> reading map
    async fn snapshot(&mut self) -> Result<ReadingSnapshot, ContractError>;
}
