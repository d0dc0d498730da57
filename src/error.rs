//! Error types for the devpulse triage service
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for devpulse operations
#[derive(Error, Debug)]
pub enum DevpulseError {
    /// Missing or malformed request fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing/invalid credential or webhook signature
    #[error("Authentication error: {0}")]
    Auth(String),

    /// AI provider request failed or no provider is configured
    #[error("AI provider error: {0}")]
    Provider(String),

    /// AI response did not contain the expected structured output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source-control data API request failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for devpulse operations
pub type Result<T> = std::result::Result<T, DevpulseError>;

/// Convert anyhow::Error to DevpulseError
impl From<anyhow::Error> for DevpulseError {
    fn from(err: anyhow::Error) -> Self {
        DevpulseError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DevpulseError::Auth("invalid signature".to_string());
        assert_eq!(err.to_string(), "Authentication error: invalid signature");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DevpulseError = json_err.into();
        assert!(matches!(err, DevpulseError::Serialization(_)));
    }
}
