//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Failed to load configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// Dispatcher could not be built
    #[error("Failed to build dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
