//! # Config Loader
//!
//! Configuration loading for the forwarder.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Overlay environment variables
//! - Validate the result and produce a `ForwarderConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("forwarder.toml")).unwrap();
//! println!("Poll every {}s", config.poll.interval_secs);
//! ```

pub mod env;
mod parser;
mod validator;

pub use contracts::ForwarderConfig;
pub use parser::ConfigFormat;
pub use validator::{target_reports, TargetReport};

use contracts::ContractError;
use std::collections::HashMap;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files, strings and
/// the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ForwarderConfig, ContractError> {
        let config = Self::read_path(path)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Defaults with `vars` applied on top
    pub fn load_from_env(vars: &HashMap<String, String>) -> Result<ForwarderConfig, ContractError> {
        Self::load(None, vars)
    }

    /// Optional file, then environment overlay, then validation
    pub fn load(
        path: Option<&Path>,
        vars: &HashMap<String, String>,
    ) -> Result<ForwarderConfig, ContractError> {
        let config = match path {
            Some(path) => Self::read_path(path)?,
            None => ForwarderConfig::default(),
        };
        Self::overlay(config, vars)
    }

    /// [`load`](Self::load) for file content the caller has already read
    pub fn load_content(
        content: Option<(&str, ConfigFormat)>,
        vars: &HashMap<String, String>,
    ) -> Result<ForwarderConfig, ContractError> {
        let config = match content {
            Some((content, format)) => parser::parse(content, format)?,
            None => ForwarderConfig::default(),
        };
        Self::overlay(config, vars)
    }

    /// [`load`](Self::load) with the process environment
    pub fn load_with_process_env(path: Option<&Path>) -> Result<ForwarderConfig, ContractError> {
        Self::load(path, &env::process_env())
    }

    /// Serialize ForwarderConfig to TOML string
    pub fn to_toml(config: &ForwarderConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ForwarderConfig to JSON string
    pub fn to_json(config: &ForwarderConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    pub fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn overlay(
        mut config: ForwarderConfig,
        vars: &HashMap<String, String>,
    ) -> Result<ForwarderConfig, ContractError> {
        env::apply(&mut config, vars)?;
        validator::validate(&config)?;
        Ok(config)
    }

    fn read_path(path: &Path) -> Result<ForwarderConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        parser::parse(&content, format)
    }
}
