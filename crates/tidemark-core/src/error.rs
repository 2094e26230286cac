//! Core error types for Tidemark.
//!
//! This module defines the central error type shared by the backup engine
//! crates, plus the configuration-specific error.

use thiserror::Error;

/// Central error type for Tidemark operations.
#[derive(Error, Debug)]
pub enum TidemarkError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `TidemarkError`.
pub type Result<T> = std::result::Result<T, TidemarkError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TidemarkError::Validation("bad time".to_string());
        assert_eq!(err.to_string(), "validation error: bad time");

        let err = ConfigError::InvalidValue {
            field: "backup.destination_path".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for backup.destination_path: must not be empty"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: TidemarkError = config_err.into();
        assert!(matches!(err, TidemarkError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: TidemarkError = io_err.into();
        assert!(matches!(err, TidemarkError::Io(_)));
    }
}
