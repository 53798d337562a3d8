//! Queue error types

use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors from the persistent queue
#[derive(Debug, Error)]
pub enum QueueError {
    /// Filesystem operation failed
    #[error("queue io error at '{path}': {source}")]
    Io {
        /// Path involved in the failed operation
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A payload exceeded the 4 GiB record limit
    #[error("payload of {length} bytes exceeds the record size limit")]
    PayloadTooLarge {
        /// Offending payload length
        length: usize,
    },

    /// Operation on a closed queue
    #[error("queue is closed")]
    Closed,
}

impl QueueError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
