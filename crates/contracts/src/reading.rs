//! Reading / ReadingSnapshot - poll loop input
//!
//! A snapshot is the latest reading per hydrometer color, captured once per
//! poll tick by the external reading store.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::ColorFilter;

/// Default staleness window for readings
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Latest data received from one hydrometer
///
/// Serializes to the schema the legacy endpoint expects for each entry of
/// its `tilts` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Shell color, the stable key of the hydrometer
    pub color: String,

    /// Raw specific gravity of the last packet
    #[serde(default)]
    pub gravity: Option<f64>,

    /// Raw temperature (°F) of the last packet
    #[serde(default)]
    pub temp: Option<f64>,

    /// Smoothed specific gravity
    #[serde(default)]
    pub smoothed_gravity: Option<f64>,

    /// Smoothed temperature (°F)
    #[serde(default)]
    pub smoothed_temp: Option<f64>,

    /// Received signal strength (dBm)
    #[serde(default)]
    pub rssi: Option<i32>,

    /// Weeks since the battery was replaced
    #[serde(default)]
    pub weeks_on_battery: Option<f64>,

    #[serde(default)]
    pub firmware_version: Option<String>,

    /// High-resolution hardware variant
    #[serde(default)]
    pub tilt_pro: bool,

    #[serde(default)]
    pub sends_battery: bool,

    /// When the last packet from this hydrometer arrived
    pub last_seen: DateTime<Utc>,
}

impl Reading {
    /// Create a reading with only the color and arrival time set
    pub fn new(color: impl Into<String>, last_seen: DateTime<Utc>) -> Self {
        Self {
            color: color.into(),
            gravity: None,
            temp: None,
            smoothed_gravity: None,
            smoothed_temp: None,
            rssi: None,
            weeks_on_battery: None,
            firmware_version: None,
            tilt_pro: false,
            sends_battery: false,
            last_seen,
        }
    }

    /// Whether the reading is older than `max_age` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.last_seen) > max_age
    }
}

/// Color -> reading map captured at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSnapshot {
    readings: BTreeMap<String, Reading>,
    max_age: Duration,
    captured_at: DateTime<Utc>,
}

impl ReadingSnapshot {
    /// Create a snapshot captured now
    pub fn new(readings: impl IntoIterator<Item = Reading>, max_age: Duration) -> Self {
        Self::captured_at(readings, max_age, Utc::now())
    }

    /// Create a snapshot captured at a specific instant
    pub fn captured_at(
        readings: impl IntoIterator<Item = Reading>,
        max_age: Duration,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let mut snapshot = Self {
            readings: BTreeMap::new(),
            max_age,
            captured_at,
        };
        for reading in readings {
            snapshot.insert(reading);
        }
        snapshot
    }

    /// Insert or replace the reading for its color
    pub fn insert(&mut self, reading: Reading) {
        self.readings.insert(reading.color.clone(), reading);
    }

    pub fn get(&self, color: &str) -> Option<&Reading> {
        self.readings.get(color)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// All readings, expired or not, ordered by color
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.values()
    }

    /// Readings that have not expired at capture time
    pub fn fresh(&self) -> impl Iterator<Item = &Reading> {
        self.readings
            .values()
            .filter(move |r| !r.is_expired(self.captured_at, self.max_age))
    }

    /// Fresh readings that pass `filter`
    pub fn eligible(&self, filter: &ColorFilter) -> Vec<&Reading> {
        self.fresh().filter(|r| filter.matches(&r.color)).collect()
    }
}

impl Default for ReadingSnapshot {
    fn default() -> Self {
        Self::new(std::iter::empty(), DEFAULT_MAX_AGE)
    }
}
