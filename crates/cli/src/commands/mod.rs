//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_forwarder;
pub use validate::run_validate;

use std::path::Path;

use contracts::ForwarderConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load file (if any) plus environment, failing early on a missing file
fn load_config(path: Option<&Path>) -> Result<ForwarderConfig> {
    match path {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
        }
        None => info!("No configuration file, using environment only"),
    }

    Ok(config_loader::ConfigLoader::load_with_process_env(path)?)
}

/// Display form of an optional config path
fn describe_source(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(environment)".to_string())
}
