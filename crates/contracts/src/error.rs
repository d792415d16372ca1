//! Layered error definitions
//!
//! Categorized by source: config / transport / remote / response

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Color value outside the known hydrometer colors
    #[error("invalid tilt color '{value}', expected one of {expected}")]
    InvalidColor { value: String, expected: String },

    // ===== Target Errors =====
    /// Transport failure (timeout, refused connection, DNS)
    #[error("target '{target}' transport error: {message}")]
    Transport { target: String, message: String },

    /// Remote endpoint answered with a non-success status
    #[error("target '{target}' rejected request with status {status}: {body}")]
    RemoteRejection {
        target: String,
        status: u16,
        body: String,
    },

    /// Response body could not be interpreted
    #[error("target '{target}' returned a malformed response: {message}")]
    MalformedResponse { target: String, message: String },

    /// Payload could not be encoded
    #[error("target '{target}' payload encode error: {message}")]
    PayloadEncode { target: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create remote rejection error
    pub fn remote_rejection(target: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::RemoteRejection {
            target: target.into(),
            status,
            body: body.into(),
        }
    }

    /// Create malformed response error
    pub fn malformed_response(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create payload encode error
    pub fn payload_encode(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadEncode {
            target: target.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_rejection_message() {
        let err = ContractError::remote_rejection("vendor_cloud", 503, "maintenance");
        let msg = err.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("maintenance"), "got: {msg}");
    }
}
