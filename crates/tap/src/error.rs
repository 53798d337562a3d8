//! Tap error types

use thiserror::Error;

/// Result type for tap construction
pub type Result<T> = std::result::Result<T, TapError>;

/// Errors from building the tap middleware
///
/// The tap only fails at construction time; per-request audit failures are
/// logged, never returned.
#[derive(Debug, Error)]
pub enum TapError {
    /// Filter compilation failed
    #[error(transparent)]
    Event(#[from] tapwire_events::EventError),

    /// A size string in the configuration did not parse
    #[error(transparent)]
    Config(#[from] tapwire_config::ConfigError),
}
