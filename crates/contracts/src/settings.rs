//! ForwarderConfig - Config Loader output
//!
//! Raw per-target settings as read from file / environment, plus the
//! validated endpoint types targets are built from.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{ColorFilter, ContractError};

/// Complete forwarder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Legacy HTTP endpoint (batched JSON)
    pub legacy: LegacyTargetSettings,

    /// Vendor cloud API (one request per reading)
    pub vendor_cloud: VendorCloudSettings,

    /// InfluxDB v2 time-series database
    pub influxdb: InfluxDbSettings,

    /// Poll loop settings
    pub poll: PollSettings,
}

/// Legacy HTTP target settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyTargetSettings {
    pub enabled: bool,
    pub url: Option<String>,
    /// Color filter, unset means every color
    pub color: Option<String>,
    pub send_interval_secs: f64,
}

impl Default for LegacyTargetSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            color: None,
            send_interval_secs: 3.0,
        }
    }
}

/// Vendor cloud target settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorCloudSettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Color filter, unset means every color
    pub color: Option<String>,
    /// Value sent as the tilt angle field
    pub tilt_angle: f64,
    /// Initial interval, replaced by `next_request_ms` hints
    pub send_interval_secs: f64,
}

impl Default for VendorCloudSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            api_key: None,
            color: None,
            tilt_angle: DEFAULT_TILT_ANGLE,
            send_interval_secs: 3.0,
        }
    }
}

/// Placeholder tilt angle reported to the vendor cloud
pub const DEFAULT_TILT_ANGLE: f64 = 123.456;

/// InfluxDB target settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxDbSettings {
    pub enabled: bool,
    pub url: String,
    pub token: Option<String>,
    pub org: String,
    pub bucket: String,
    pub beer_name: String,
    /// Baseline gravity used for ABV / attenuation
    pub original_gravity: Option<f64>,
    /// Required color filter
    pub color: Option<String>,
    pub send_interval_secs: f64,
}

impl Default for InfluxDbSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://127.0.0.1:8086".to_string(),
            token: None,
            org: "brewhouse".to_string(),
            bucket: "fermenter".to_string(),
            beer_name: "Beer".to_string(),
            original_gravity: None,
            color: None,
            send_interval_secs: 15.0,
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Seconds between dispatch ticks
    pub interval_secs: f64,
    /// Staleness window for readings
    pub max_age_secs: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            max_age_secs: 300.0,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Result<Duration, ContractError> {
        positive_duration("poll.interval_secs", self.interval_secs)
    }

    pub fn max_age(&self) -> Result<Duration, ContractError> {
        positive_duration("poll.max_age_secs", self.max_age_secs)
    }
}

// ===== Validated endpoints =====

/// Validated legacy endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyEndpoint {
    pub url: Url,
    pub filter: ColorFilter,
    pub send_interval: Duration,
}

impl TryFrom<&LegacyTargetSettings> for LegacyEndpoint {
    type Error = ContractError;

    fn try_from(settings: &LegacyTargetSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            url: http_url("legacy.url", settings.url.as_deref())?,
            filter: color_filter("legacy.color", settings.color.as_deref(), true)?,
            send_interval: positive_duration(
                "legacy.send_interval_secs",
                settings.send_interval_secs,
            )?,
        })
    }
}

/// Validated vendor cloud endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct VendorCloudEndpoint {
    pub url: Url,
    pub api_key: String,
    pub filter: ColorFilter,
    pub tilt_angle: f64,
    pub send_interval: Duration,
}

impl TryFrom<&VendorCloudSettings> for VendorCloudEndpoint {
    type Error = ContractError;

    fn try_from(settings: &VendorCloudSettings) -> Result<Self, Self::Error> {
        if !settings.tilt_angle.is_finite() {
            return Err(ContractError::config_validation(
                "vendor_cloud.tilt_angle",
                "tilt_angle must be a finite number",
            ));
        }
        Ok(Self {
            url: http_url("vendor_cloud.url", settings.url.as_deref())?,
            api_key: required("vendor_cloud.api_key", settings.api_key.as_deref())?,
            filter: color_filter("vendor_cloud.color", settings.color.as_deref(), true)?,
            tilt_angle: settings.tilt_angle,
            send_interval: positive_duration(
                "vendor_cloud.send_interval_secs",
                settings.send_interval_secs,
            )?,
        })
    }
}

/// Validated InfluxDB endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxDbEndpoint {
    /// Fully qualified `/api/v2/write` URL including org, bucket and precision
    pub write_url: Url,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub beer_name: String,
    pub original_gravity: f64,
    pub filter: ColorFilter,
    pub send_interval: Duration,
}

impl TryFrom<&InfluxDbSettings> for InfluxDbEndpoint {
    type Error = ContractError;

    fn try_from(settings: &InfluxDbSettings) -> Result<Self, Self::Error> {
        let filter = color_filter("influxdb.color", settings.color.as_deref(), false)?;
        let base = http_url("influxdb.url", Some(&settings.url))?;
        let token = required("influxdb.token", settings.token.as_deref())?;
        let org = required("influxdb.org", Some(&settings.org))?;
        let bucket = required("influxdb.bucket", Some(&settings.bucket))?;
        let beer_name = required("influxdb.beer_name", Some(&settings.beer_name))?;

        let original_gravity = settings.original_gravity.ok_or_else(|| {
            ContractError::config_validation("influxdb.original_gravity", "value is required")
        })?;
        if !original_gravity.is_finite() || (original_gravity - 1.0).abs() < f64::EPSILON {
            return Err(ContractError::config_validation(
                "influxdb.original_gravity",
                format!("original_gravity must be finite and not 1.000, got {original_gravity}"),
            ));
        }

        Ok(Self {
            write_url: influx_write_url(&base, &org, &bucket)?,
            token,
            org,
            bucket,
            beer_name,
            original_gravity,
            filter,
            send_interval: positive_duration(
                "influxdb.send_interval_secs",
                settings.send_interval_secs,
            )?,
        })
    }
}

fn influx_write_url(base: &Url, org: &str, bucket: &str) -> Result<Url, ContractError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ContractError::config_validation("influxdb.url", "URL cannot be a base"))?
        .pop_if_empty()
        .extend(["api", "v2", "write"]);
    url.query_pairs_mut()
        .clear()
        .append_pair("org", org)
        .append_pair("bucket", bucket)
        .append_pair("precision", "ms");
    Ok(url)
}

fn required(field: &str, value: Option<&str>) -> Result<String, ContractError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ContractError::config_validation(field, "value is required")),
    }
}

fn http_url(field: &str, value: Option<&str>) -> Result<Url, ContractError> {
    let raw = required(field, value)?;
    let url = Url::parse(&raw)
        .map_err(|e| ContractError::config_validation(field, format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ContractError::config_validation(
            field,
            format!("URL must be http(s) with a host, got '{raw}'"),
        )),
    }
}

fn color_filter(
    field: &str,
    value: Option<&str>,
    default_any: bool,
) -> Result<ColorFilter, ContractError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map_err(|e: ContractError| {
            ContractError::config_validation(field, e.to_string())
        }),
        None if default_any => Ok(ColorFilter::Any),
        None => Err(ContractError::config_validation(
            field,
            format!("value is required, expected one of {}", ColorFilter::expected_values()),
        )),
    }
}

/// Seconds to a non-zero `Duration`; out-of-range values are rejected
fn positive_duration(field: &str, secs: f64) -> Result<Duration, ContractError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ContractError::config_validation(
            field,
            format!("must be > 0, got {secs}"),
        ));
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        Ok(_) => Err(ContractError::config_validation(
            field,
            format!("{secs} rounds down to zero"),
        )),
        Err(e) => Err(ContractError::config_validation(
            field,
            format!("{secs} is out of range: {e}"),
        )),
    }
}
