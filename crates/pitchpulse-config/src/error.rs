//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not `.yaml`, `.yml` or `.toml`
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The file did not parse
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// An environment override had an invalid value
    #[error("Invalid value for environment variable {name}: {message}")]
    InvalidEnv {
        /// Variable name
        name: String,
        /// What was wrong with it
        message: String,
    },

    /// Field-level validation failed
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
