//! Sink error types

use std::io;
use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors from sink construction and operation
#[derive(Debug, Error)]
pub enum SinkError {
    /// Unusable sink settings
    #[error("invalid sink config: {0}")]
    InvalidConfig(String),

    /// Persistent queue failure
    #[error(transparent)]
    Queue(#[from] tapwire_queue::QueueError),

    /// Filesystem failure
    #[error("sink io error at '{path}': {source}")]
    Io {
        /// Path involved in the failed operation
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// TLS root certificate could not be loaded
    #[error("failed to load root certificate from '{path}': {message}")]
    Certificate {
        /// Configured certificate path
        path: String,
        /// What went wrong
        message: String,
    },

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
