//! Config file parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{ContractError, ForwarderConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<ForwarderConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<ForwarderConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<ForwarderConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[legacy]
enabled = true
url = "http://fermentrack.local/api/gravity/ispindel/"

[influxdb]
enabled = true
token = "abc"
original_gravity = 1.055
color = "Red"
send_interval_secs = 30.0

[poll]
interval_secs = 2.0
"#;
        let config = parse_toml(content).unwrap();
        assert!(config.legacy.enabled);
        assert_eq!(config.legacy.send_interval_secs, 3.0);
        assert!(!config.vendor_cloud.enabled);
        assert_eq!(config.influxdb.org, "brewhouse");
        assert_eq!(config.influxdb.send_interval_secs, 30.0);
        assert_eq!(config.poll.interval_secs, 2.0);
        assert_eq!(config.poll.max_age_secs, 300.0);
    }

    #[test]
    fn test_parse_empty_document_gives_defaults() {
        assert_eq!(parse_toml("").unwrap(), ForwarderConfig::default());
        assert_eq!(parse_json("{}").unwrap(), ForwarderConfig::default());
    }

    #[test]
    fn test_parse_json_sections() {
        let content = r#"{
            "vendor_cloud": {
                "enabled": true,
                "url": "https://brewbricks.com/api/iot/v1",
                "api_key": "J1okPxXwdFoSvt9Bnz5V",
                "tilt_angle": 40.23
            }
        }"#;
        let config = parse_json(content).unwrap();
        assert!(config.vendor_cloud.enabled);
        assert_eq!(config.vendor_cloud.tilt_angle, 40.23);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
