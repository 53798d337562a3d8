//! Event model error types

use thiserror::Error;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors from event construction and encoding
#[derive(Debug, Error)]
pub enum EventError {
    /// A filter `matches` pattern failed to compile
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

    /// Event failed to serialise
    #[error("failed to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),
}
