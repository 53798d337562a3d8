//! Tapwire Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tapwire_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[audit]\nproxying_for = \"api\"\nendpoint = \"https://audit.example.com/events\"\ndisk_store_path = \"/tmp/audit-queue\"",
//! )
//! .unwrap();
//! assert_eq!(config.audit.endpoint, "https://audit.example.com/events");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [audit]
//! type = "http"
//! endpoint = "https://audit.example.com/events"
//! proxying_for = "api"
//! audit_source = "transaction-gateway"
//! audit_type = "RequestReceived"
//! num_producers = 4
//! channel_length = 1000
//! disk_store_path = "/var/lib/tapwire/queue"
//! max_entity_length = "32Ki"
//! mask_fields = ["password", "secret"]
//!
//! [audit.exclusions.healthcheck]
//! header_name = "path"
//! starts_with = ["/ping"]
//!
//! [audit.header_mappings.requestHeaders]
//! trackingId = "x-tracking-id"
//! ```

mod audit;
mod error;
mod filters;
mod mappings;
mod size;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use audit::{AuditConfig, ProxyingFor, SinkType};
pub use error::{ConfigError, Result};
pub use filters::{
    Exclusions, FilterOption, Inclusions, RequestBodyCaptures, RequestBodyIgnores,
};
pub use mappings::{
    FieldHeaderMapping, HeaderMappings, REQUEST_HEADERS_SECTION, RESPONSE_HEADERS_SECTION,
};
pub use size::parse_size;
pub use validation::validate_config;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults, except the audit
/// section's required fields (checked by [`validate_config`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audit tap and sink settings
    pub audit: AuditConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Validate the configuration
    ///
    /// Checks required fields, size strings and filter regexes.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        Ok(config)
    }
}
