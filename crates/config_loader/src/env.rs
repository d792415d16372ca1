//! Environment overlay
//!
//! Keys keep the names used by existing deployments. A key that is present
//! and non-empty overrides the value from the config file.

use std::collections::HashMap;
use std::str::FromStr;

use contracts::{ContractError, ForwarderConfig};

pub const LEGACY_ENABLED: &str = "FERMENTRACK_LEGACY_TARGET_ENABLED";
pub const LEGACY_URL: &str = "FERMENTRACK_LEGACY_TARGET_URL";
pub const LEGACY_COLOR: &str = "FERMENTRACK_LEGACY_TILT_COLOR";
pub const LEGACY_INTERVAL: &str = "FERMENTRACK_LEGACY_SEND_INTERVAL_SECS";

pub const VENDOR_ENABLED: &str = "BIERBOT_TARGET_ENABLED";
pub const VENDOR_URL: &str = "BIERBOT_TARGET_URL";
pub const VENDOR_API_KEY: &str = "BIERBOT_APIKEY";
pub const VENDOR_COLOR: &str = "BIERBOT_TILT_COLOR";
pub const VENDOR_TILT_ANGLE: &str = "BIERBOT_TILT_ANGLE";
pub const VENDOR_INTERVAL: &str = "BIERBOT_SEND_INTERVAL_SECS";

pub const INFLUX_ENABLED: &str = "INFLUXDB2_TARGET_ENABLED";
pub const INFLUX_URL: &str = "INFLUXDB2_URL";
pub const INFLUX_TOKEN: &str = "INFLUXDB2_TOKEN";
pub const INFLUX_ORG: &str = "INFLUXDB2_ORG";
pub const INFLUX_BUCKET: &str = "INFLUXDB2_BUCKET";
pub const INFLUX_BEER_NAME: &str = "INFLUXDB2_BEERNAME";
pub const INFLUX_OG: &str = "INFLUXDB2_OG";
pub const INFLUX_COLOR: &str = "TILT_COLOR";
pub const INFLUX_INTERVAL: &str = "INFLUXDB2_SEND_INTERVAL_SECS";

pub const POLL_INTERVAL: &str = "TILT_POLL_INTERVAL_SECS";
pub const MAX_AGE: &str = "TILT_MAX_AGE_SECS";

/// Every key the overlay reads
pub const ALL_KEYS: &[&str] = &[
    LEGACY_ENABLED,
    LEGACY_URL,
    LEGACY_COLOR,
    LEGACY_INTERVAL,
    VENDOR_ENABLED,
    VENDOR_URL,
    VENDOR_API_KEY,
    VENDOR_COLOR,
    VENDOR_TILT_ANGLE,
    VENDOR_INTERVAL,
    INFLUX_ENABLED,
    INFLUX_URL,
    INFLUX_TOKEN,
    INFLUX_ORG,
    INFLUX_BUCKET,
    INFLUX_BEER_NAME,
    INFLUX_OG,
    INFLUX_COLOR,
    INFLUX_INTERVAL,
    POLL_INTERVAL,
    MAX_AGE,
];

/// Collect the overlay keys from the process environment
pub fn process_env() -> HashMap<String, String> {
    ALL_KEYS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
        .collect()
}

/// Apply environment values on top of `config`
pub fn apply(config: &mut ForwarderConfig, vars: &HashMap<String, String>) -> Result<(), ContractError> {
    let env = Overlay { vars };

    env.flag(LEGACY_ENABLED, &mut config.legacy.enabled);
    env.optional(LEGACY_URL, &mut config.legacy.url);
    env.optional(LEGACY_COLOR, &mut config.legacy.color);
    env.number(LEGACY_INTERVAL, &mut config.legacy.send_interval_secs)?;

    env.flag(VENDOR_ENABLED, &mut config.vendor_cloud.enabled);
    env.optional(VENDOR_URL, &mut config.vendor_cloud.url);
    env.optional(VENDOR_API_KEY, &mut config.vendor_cloud.api_key);
    env.optional(VENDOR_COLOR, &mut config.vendor_cloud.color);
    env.number(VENDOR_TILT_ANGLE, &mut config.vendor_cloud.tilt_angle)?;
    env.number(VENDOR_INTERVAL, &mut config.vendor_cloud.send_interval_secs)?;

    env.flag(INFLUX_ENABLED, &mut config.influxdb.enabled);
    env.string(INFLUX_URL, &mut config.influxdb.url);
    env.optional(INFLUX_TOKEN, &mut config.influxdb.token);
    env.string(INFLUX_ORG, &mut config.influxdb.org);
    env.string(INFLUX_BUCKET, &mut config.influxdb.bucket);
    env.string(INFLUX_BEER_NAME, &mut config.influxdb.beer_name);
    env.optional_number(INFLUX_OG, &mut config.influxdb.original_gravity)?;
    env.optional(INFLUX_COLOR, &mut config.influxdb.color);
    env.number(INFLUX_INTERVAL, &mut config.influxdb.send_interval_secs)?;

    env.number(POLL_INTERVAL, &mut config.poll.interval_secs)?;
    env.number(MAX_AGE, &mut config.poll.max_age_secs)?;
    Ok(())
}

struct Overlay<'a> {
    vars: &'a HashMap<String, String>,
}

impl Overlay<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Only a case-insensitive `true` enables
    fn flag(&self, key: &str, slot: &mut bool) {
        if let Some(value) = self.get(key) {
            *slot = value.eq_ignore_ascii_case("true");
        }
    }

    fn string(&self, key: &str, slot: &mut String) {
        if let Some(value) = self.get(key) {
            *slot = value.to_string();
        }
    }

    fn optional(&self, key: &str, slot: &mut Option<String>) {
        if let Some(value) = self.get(key) {
            *slot = Some(value.to_string());
        }
    }

    fn number<T: FromStr>(&self, key: &str, slot: &mut T) -> Result<(), ContractError> {
        if let Some(value) = self.get(key) {
            *slot = parse_number(key, value)?;
        }
        Ok(())
    }

    fn optional_number<T: FromStr>(
        &self,
        key: &str,
        slot: &mut Option<T>,
    ) -> Result<(), ContractError> {
        if let Some(value) = self.get(key) {
            *slot = Some(parse_number(key, value)?);
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ContractError> {
    value
        .parse()
        .map_err(|_| ContractError::config_validation(key, format!("not a number: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_env_keeps_defaults() {
        let mut config = ForwarderConfig::default();
        apply(&mut config, &HashMap::new()).unwrap();
        assert_eq!(config, ForwarderConfig::default());
    }

    #[test]
    fn test_flags_are_case_insensitive() {
        let mut config = ForwarderConfig::default();
        apply(
            &mut config,
            &vars(&[
                (LEGACY_ENABLED, "TRUE"),
                (VENDOR_ENABLED, "True"),
                (INFLUX_ENABLED, "yes"),
            ]),
        )
        .unwrap();

        assert!(config.legacy.enabled);
        assert!(config.vendor_cloud.enabled);
        assert!(!config.influxdb.enabled);
    }

    #[test]
    fn test_influx_keys() {
        let mut config = ForwarderConfig::default();
        apply(
            &mut config,
            &vars(&[
                (INFLUX_URL, "http://influx:8086"),
                (INFLUX_TOKEN, "tok"),
                (INFLUX_BEER_NAME, "Dry Stout"),
                (INFLUX_OG, "1.048"),
                (INFLUX_COLOR, "Black"),
            ]),
        )
        .unwrap();

        assert_eq!(config.influxdb.url, "http://influx:8086");
        assert_eq!(config.influxdb.token.as_deref(), Some("tok"));
        assert_eq!(config.influxdb.beer_name, "Dry Stout");
        assert_eq!(config.influxdb.original_gravity, Some(1.048));
        assert_eq!(config.influxdb.color.as_deref(), Some("Black"));
        assert_eq!(config.influxdb.org, "brewhouse");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ForwarderConfig::default();
        config.legacy.url = Some("http://from-file/".into());
        config.poll.interval_secs = 5.0;

        apply(
            &mut config,
            &vars(&[(LEGACY_URL, "http://from-env/"), (POLL_INTERVAL, "0.5")]),
        )
        .unwrap();

        assert_eq!(config.legacy.url.as_deref(), Some("http://from-env/"));
        assert_eq!(config.poll.interval_secs, 0.5);
    }

    #[test]
    fn test_blank_value_is_ignored() {
        let mut config = ForwarderConfig::default();
        config.vendor_cloud.api_key = Some("file-key".into());
        apply(&mut config, &vars(&[(VENDOR_API_KEY, "  ")])).unwrap();
        assert_eq!(config.vendor_cloud.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let mut config = ForwarderConfig::default();
        let err = apply(&mut config, &vars(&[(INFLUX_OG, "one point oh")])).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
        assert!(err.to_string().contains(INFLUX_OG));
    }
}
