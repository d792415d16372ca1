//! Config validation
//!
//! Rules:
//! - poll interval and staleness window are positive (fatal)
//! - each enabled target has a complete, valid endpoint (reported per target;
//!   a broken target never stops the others)

use contracts::{
    ContractError, ForwarderConfig, InfluxDbEndpoint, LegacyEndpoint, VendorCloudEndpoint,
};

/// Validate the settings without which the forwarder cannot run
///
/// Returns the first error encountered.
pub fn validate(config: &ForwarderConfig) -> Result<(), ContractError> {
    config.poll.interval()?;
    config.poll.max_age()?;
    Ok(())
}

/// Validation result for one target section
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub name: &'static str,
    pub enabled: bool,
    /// Why the endpoint is unusable, if it is
    pub error: Option<String>,
}

impl TargetReport {
    fn new<E>(name: &'static str, enabled: bool, endpoint: Result<E, ContractError>) -> Self {
        Self {
            name,
            enabled,
            error: endpoint.err().map(|e| e.to_string()),
        }
    }

    /// Enabled and valid
    pub fn is_active(&self) -> bool {
        self.enabled && self.error.is_none()
    }

    /// Enabled but unusable
    pub fn is_misconfigured(&self) -> bool {
        self.enabled && self.error.is_some()
    }
}

/// Check every target section, in dispatch order
pub fn target_reports(config: &ForwarderConfig) -> Vec<TargetReport> {
    vec![
        TargetReport::new(
            "legacy_http",
            config.legacy.enabled,
            LegacyEndpoint::try_from(&config.legacy),
        ),
        TargetReport::new(
            "vendor_cloud",
            config.vendor_cloud.enabled,
            VendorCloudEndpoint::try_from(&config.vendor_cloud),
        ),
        TargetReport::new(
            "influxdb",
            config.influxdb.enabled,
            InfluxDbEndpoint::try_from(&config.influxdb),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ForwarderConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = ForwarderConfig::default();
        config.poll.interval_secs = 0.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("poll.interval_secs"));
    }

    #[test]
    fn test_negative_max_age_rejected() {
        let mut config = ForwarderConfig::default();
        config.poll.max_age_secs = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_reports() {
        let mut config = ForwarderConfig::default();
        config.legacy.enabled = true;
        config.legacy.url = Some("http://fermentrack.local/api/".into());
        config.influxdb.enabled = true;
        config.influxdb.token = Some("tok".into());
        config.influxdb.original_gravity = Some(1.050);
        config.influxdb.color = Some("teal".into());

        let reports = target_reports(&config);
        let names: Vec<_> = reports.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["legacy_http", "vendor_cloud", "influxdb"]);

        assert!(reports[0].is_active());
        assert!(!reports[1].enabled);
        assert!(!reports[1].is_misconfigured());
        assert!(reports[2].is_misconfigured());
        assert!(reports[2].error.as_ref().unwrap().contains("influxdb.color"));
    }
}
