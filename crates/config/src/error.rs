//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error - required field missing
    #[error("audit config is missing required field '{field}'")]
    MissingField {
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("audit config has invalid {field}: {message}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Unparseable size string
    #[error("invalid size '{value}': {message}")]
    InvalidSize {
        /// The offending input
        value: String,
        /// What went wrong
        message: String,
    },

    /// A `matches` filter pattern failed to compile
    #[error("filter '{filter}' has invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Name of the filter
        filter: String,
        /// The offending pattern
        pattern: String,
        /// Regex compile error
        #[source]
        source: regex::Error,
    },
}
