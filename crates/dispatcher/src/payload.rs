//! Payload transformers - reading -> target wire schema
//!
//! Pure functions only. Missing numeric fields are treated as 0.

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::Reading;
use serde::Serialize;
use std::fmt::Write;

/// Brand reported to the vendor cloud
pub const VENDOR_BRAND: &str = "tiltbridge_junior";

/// Payload version reported to the vendor cloud
pub const VENDOR_PAYLOAD_VERSION: &str = "1.0";

/// Measurement name for time-series records
pub const MEASUREMENT: &str = "tilt";

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// °F -> °C, unrounded
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Alcohol by volume (%), 2 decimals
pub fn alcohol_by_volume(original_gravity: f64, gravity: f64) -> f64 {
    round_to((original_gravity - gravity) * 131.25, 2)
}

/// Apparent attenuation (%), 1 decimal
///
/// Returns 0 when `original_gravity` is 1.000, which configuration
/// validation already rejects.
pub fn apparent_attenuation(original_gravity: f64, gravity: f64) -> f64 {
    let extract = original_gravity - 1.0;
    if extract.abs() < f64::EPSILON {
        return 0.0;
    }
    round_to((original_gravity - gravity) / extract * 100.0, 1)
}

/// Degrees Plato from specific gravity (cubic approximation), 1 decimal
pub fn plato(gravity: f64) -> f64 {
    round_to(
        -616.868 + 1111.14 * gravity - 630.272 * gravity.powi(2) + 135.997 * gravity.powi(3),
        1,
    )
}

// ===== Legacy HTTP =====

/// Batched body for the legacy endpoint
#[derive(Debug, Serialize)]
pub struct LegacyPayload<'a> {
    pub tilts: Vec<&'a Reading>,
    pub tiltbridge_junior: bool,
}

impl<'a> LegacyPayload<'a> {
    pub fn new(readings: Vec<&'a Reading>) -> Self {
        Self {
            tilts: readings,
            tiltbridge_junior: true,
        }
    }
}

// ===== Vendor cloud =====

/// Flattened per-reading body for the vendor cloud API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorCloudPayload {
    pub apikey: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub brand: &'static str,
    pub version: &'static str,
    pub chipid: String,
    /// Gravity, 3 decimals
    pub s_number_wort_0: f64,
    /// Temperature in °C, 2 decimals
    pub s_number_temp_0: f64,
    pub s_number_voltage_0: f64,
    pub s_number_wifi_0: i32,
    pub s_number_tilt_0: f64,
}

impl VendorCloudPayload {
    pub fn from_reading(reading: &Reading, api_key: &str, tilt_angle: f64) -> Self {
        let gravity = reading.smoothed_gravity.unwrap_or(0.0);
        let temp_f = reading.smoothed_temp.unwrap_or(0.0);

        Self {
            apikey: api_key.to_string(),
            kind: "tilt",
            brand: VENDOR_BRAND,
            version: VENDOR_PAYLOAD_VERSION,
            chipid: reading.color.clone(),
            s_number_wort_0: round_to(gravity, 3),
            s_number_temp_0: round_to(fahrenheit_to_celsius(temp_f), 2),
            s_number_voltage_0: reading.weeks_on_battery.unwrap_or(0.0),
            s_number_wifi_0: reading.rssi.unwrap_or(0),
            s_number_tilt_0: tilt_angle,
        }
    }
}

// ===== Time-series =====

/// One time-series point with derived brewing metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluxRecord {
    pub measurement: &'static str,
    pub tags: InfluxTags,
    #[serde(serialize_with = "serialize_iso8601")]
    pub time: DateTime<Utc>,
    pub fields: InfluxFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluxTags {
    pub color: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluxFields {
    pub temp_fahrenheit: f64,
    pub temp_celsius: f64,
    pub gravity: f64,
    pub original_gravity: f64,
    pub alcohol_by_volume: f64,
    pub apparent_attenuation: f64,
    pub plato: f64,
}

impl InfluxRecord {
    /// Build a record
    ///
    /// Precondition: the reading carries a smoothed gravity; a missing value
    /// is treated as 0 and yields meaningless derived metrics.
    pub fn from_reading(
        reading: &Reading,
        beer_name: &str,
        original_gravity: f64,
        time: DateTime<Utc>,
    ) -> Self {
        let temp_fahrenheit = round_to(reading.smoothed_temp.unwrap_or(0.0), 1);
        let gravity = round_to(reading.smoothed_gravity.unwrap_or(0.0), 3);
        let original_gravity = round_to(original_gravity, 3);

        Self {
            measurement: MEASUREMENT,
            tags: InfluxTags {
                color: reading.color.clone(),
                name: beer_name.to_string(),
            },
            time,
            fields: InfluxFields {
                temp_fahrenheit,
                temp_celsius: round_to(fahrenheit_to_celsius(temp_fahrenheit), 1),
                gravity,
                original_gravity,
                alcohol_by_volume: alcohol_by_volume(original_gravity, gravity),
                apparent_attenuation: apparent_attenuation(original_gravity, gravity),
                plato: plato(gravity),
            },
        }
    }

    /// Render as one InfluxDB line protocol line, millisecond precision
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(self.measurement);
        for (key, value) in [("color", &self.tags.color), ("name", &self.tags.name)] {
            // Empty tag values are invalid in line protocol
            if !value.is_empty() {
                let _ = write!(line, ",{}={}", key, escape_tag(value));
            }
        }

        let f = &self.fields;
        let fields = [
            ("temp_fahrenheit", f.temp_fahrenheit),
            ("temp_celsius", f.temp_celsius),
            ("gravity", f.gravity),
            ("original_gravity", f.original_gravity),
            ("alcohol_by_volume", f.alcohol_by_volume),
            ("apparent_attenuation", f.apparent_attenuation),
            ("plato", f.plato),
        ];
        let mut first = true;
        for (key, value) in fields.into_iter().filter(|(_, v)| v.is_finite()) {
            line.push(if first { ' ' } else { ',' });
            first = false;
            let _ = write!(line, "{key}={value:?}");
        }

        let _ = write!(line, " {}", self.time.timestamp_millis());
        line
    }
}

fn serialize_iso8601<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

fn escape_tag(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
