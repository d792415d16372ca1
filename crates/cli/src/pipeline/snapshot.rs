//! File-backed reading store.
//!
//! The document is either a JSON array of readings or an object keyed by
//! color. It is re-read on every poll tick so an external scanner can keep
//! rewriting it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{ContractError, Reading, ReadingSnapshot, SnapshotProvider};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum ReadingsDocument {
    List(Vec<Reading>),
    ByColor(BTreeMap<String, Reading>),
}

impl ReadingsDocument {
    fn into_readings(self) -> Vec<Reading> {
        match self {
            ReadingsDocument::List(readings) => readings,
            ReadingsDocument::ByColor(map) => map.into_values().collect(),
        }
    }
}

/// Snapshot provider reading a JSON file
#[derive(Debug, Clone)]
pub struct FileSnapshotProvider {
    path: PathBuf,
    max_age: Duration,
}

impl FileSnapshotProvider {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applied from the next snapshot on
    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = max_age;
    }
}

/// Parse a readings document
pub fn parse_readings(content: &str) -> Result<Vec<Reading>, ContractError> {
    serde_json::from_str::<ReadingsDocument>(content)
        .map(ReadingsDocument::into_readings)
        .map_err(|e| ContractError::Other(format!("invalid readings document: {e}")))
}

impl SnapshotProvider for FileSnapshotProvider {
    async fn snapshot(&mut self) -> Result<ReadingSnapshot, ContractError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let readings = parse_readings(&content)?;
        debug!(path = %self.path.display(), readings = readings.len(), "Readings loaded");
        Ok(ReadingSnapshot::new(readings, self.max_age))
    }
}
