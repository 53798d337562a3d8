//! Audit tap and sink configuration
//!
//! Everything the tap middleware and the delivery sinks need at startup.
//! Size fields are strings accepting SI suffixes (`32Ki`, `100K`, `1M`);
//! see [`crate::parse_size`].

use serde::Deserialize;

use crate::filters::{Exclusions, Inclusions, RequestBodyCaptures, RequestBodyIgnores};
use crate::mappings::HeaderMappings;

/// Default cap for captured request/response entities (32 KiB)
pub const DEFAULT_MAX_ENTITY_LENGTH: &str = "32Ki";

/// Default cap for a whole encoded audit event (100 000 bytes)
pub const DEFAULT_MAX_AUDIT_LENGTH: &str = "100K";

/// Default cap for combined payload contents (96 000 bytes)
pub const DEFAULT_MAX_PAYLOAD_CONTENTS_LENGTH: &str = "96K";

/// Default replacement for masked field values
pub const DEFAULT_MASK_VALUE: &str = "#########";

/// The kind of sink that receives encoded events
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    /// Asynchronous HTTP delivery backed by a disk queue (default)
    #[default]
    Http,
    /// Append encoded events to a local file, one JSON line each
    File,
    /// Count and discard (benchmarking, smoke tests)
    Blackhole,
}

/// Event flavour selection
///
/// Selects which audit event variant the tap constructs and is sent as the
/// `User-Agent` of every delivery request.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyingFor {
    /// API gateway auditing: fixed source/type, authorisation capture,
    /// forwarded-prefix path rewrite
    #[default]
    Api,
    /// RATE auditing: source/type may be derived per request
    Rate,
}

impl ProxyingFor {
    /// String form used as the delivery `User-Agent`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Rate => "rate",
        }
    }
}

/// Audit configuration
///
/// Immutable after startup. One instance configures one tap and its sinks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Sink type: http, file or blackhole
    /// Default: http
    #[serde(rename = "type")]
    pub sink_type: SinkType,

    /// Receiver URL for the http sink, file path for the file sink
    pub endpoint: String,

    /// Logical destination name forwarded to downstream consumers
    pub destination: String,

    /// Identifier for this sink client
    pub client_id: String,

    /// Version info for this sink client
    pub client_version: String,

    /// Event flavour: api or rate
    pub proxying_for: ProxyingFor,

    /// Value for `auditSource` in emitted events
    pub audit_source: String,

    /// Value for `auditType` in emitted events
    pub audit_type: String,

    /// Number of concurrent producers draining the disk queue
    /// Default: 4
    pub num_producers: usize,

    /// Capacity of the in-memory channel between the tap and the producers.
    /// Zero accepts nothing: every event is a logged drop.
    /// Default: 1000
    pub channel_length: usize,

    /// Directory for the disk-backed persistent event queue
    pub disk_store_path: String,

    /// Total per-delivery timeout in milliseconds. Deliberately short so
    /// the publish loop keeps moving when the receiver is slow; events a
    /// slow receiver cannot take in time are dropped, not retried.
    /// Default: 1000
    pub delivery_timeout_ms: u64,

    /// Preserve an inbound `X-Request-ID` header instead of generating one
    pub forward_x_request_id: bool,

    /// When set, missed-event log lines carry a keyed digest of the payload
    /// instead of the raw bytes
    pub encrypt_secret: String,

    /// Extra label carried inside generated request ids
    pub request_id_label: String,

    /// Cap for captured entities (size string, e.g. "32Ki")
    pub max_entity_length: String,

    /// Cap for a whole encoded event (size string)
    pub max_audit_length: String,

    /// Cap for combined request/response payload contents (size string)
    pub max_payload_contents_length: String,

    /// Replacement value for masked fields
    pub mask_value: String,

    /// Payload field names whose values are obfuscated
    pub mask_fields: Vec<String>,

    /// Dynamic audit fields sourced from headers, keyed by event section
    pub header_mappings: HeaderMappings,

    /// Requests matching any of these filters are not audited
    pub exclusions: Exclusions,

    /// When non-empty, only requests matching at least one filter are audited
    pub inclusions: Inclusions,

    /// When non-empty, payload contents are only captured for matching requests
    pub request_body_captures: RequestBodyCaptures,

    /// Requests matching any of these filters never have payload contents captured
    pub request_body_ignores: RequestBodyIgnores,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::Http,
            endpoint: String::new(),
            destination: String::new(),
            client_id: String::new(),
            client_version: String::new(),
            proxying_for: ProxyingFor::Api,
            audit_source: String::new(),
            audit_type: String::new(),
            num_producers: 4,
            channel_length: 1000,
            disk_store_path: String::new(),
            delivery_timeout_ms: 1000,
            forward_x_request_id: false,
            encrypt_secret: String::new(),
            request_id_label: String::new(),
            max_entity_length: DEFAULT_MAX_ENTITY_LENGTH.into(),
            max_audit_length: DEFAULT_MAX_AUDIT_LENGTH.into(),
            max_payload_contents_length: DEFAULT_MAX_PAYLOAD_CONTENTS_LENGTH.into(),
            mask_value: DEFAULT_MASK_VALUE.into(),
            mask_fields: Vec::new(),
            header_mappings: HeaderMappings::new(),
            exclusions: Exclusions::new(),
            inclusions: Inclusions::new(),
            request_body_captures: RequestBodyCaptures::new(),
            request_body_ignores: RequestBodyIgnores::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_size;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.sink_type, SinkType::Http);
        assert_eq!(config.num_producers, 4);
        assert_eq!(config.channel_length, 1000);
        assert_eq!(config.delivery_timeout_ms, 1000);
        assert_eq!(config.mask_value, "#########");
        assert_eq!(parse_size(&config.max_entity_length).unwrap(), 32 * 1024);
        assert_eq!(parse_size(&config.max_audit_length).unwrap(), 100_000);
        assert_eq!(
            parse_size(&config.max_payload_contents_length).unwrap(),
            96_000
        );
    }

    #[test]
    fn test_proxying_for_as_str() {
        assert_eq!(ProxyingFor::Api.as_str(), "api");
        assert_eq!(ProxyingFor::Rate.as_str(), "rate");
    }
}
