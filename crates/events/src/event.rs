//! Common audit event fields
//!
//! The base record shared by every event flavour, plus the population
//! helpers the flavours call from `append_request` / `append_response`.
//!
//! # Wire format
//!
//! Events serialise to camelCase JSON, UTF-8, without HTML escaping.
//! `responseStatus` is a zero-padded 3-digit string; `generatedAt` is
//! RFC 3339 UTC. `requestPayload`/`responsePayload` carry the original
//! byte length alongside the (possibly masked or cleared) contents.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use tapwire_config::{REQUEST_HEADERS_SECTION, RESPONSE_HEADERS_SECTION};

use crate::context::RequestContext;
use crate::specification::AuditSpecification;

/// A captured payload: original length plus (possibly absent) contents
///
/// `contents` is dropped by constraint enforcement when payloads must be
/// sacrificed; `length` always reflects the original body.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Payload {
    /// Original byte length, before masking or clearing
    pub length: u64,
    /// Captured (masked) contents, absent when cleared or empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// Fixed per-event metadata flags
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// Marks events published by this proxy generation
    #[serde(rename = "publishedByTraefik")]
    pub published_by_traefik: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            published_by_traefik: true,
        }
    }
}

/// What the capturing body wrapper observed about a response
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    /// Response status code
    pub status: u16,
    /// Total bytes written downstream
    pub size: u64,
    /// Buffered body, bounded by the entity cap
    pub entity: Bytes,
    /// When the response completed (UTC)
    pub completed_at: Option<DateTime<Utc>>,
}

/// The common audit event base
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Originating system identifier
    pub audit_source: String,
    /// Event category
    pub audit_type: String,
    /// UUIDv4, set once at construction and never regenerated
    pub event_id: String,
    /// RFC 3339 UTC timestamp taken when the request was appended
    pub generated_at: String,
    /// HTTP method
    pub method: String,
    /// Request path, possibly rewritten by the gateway prefix rule
    pub path: String,
    /// Original path when a rewrite occurred
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proxied_path: String,
    /// Raw query string
    pub query_string: String,
    /// Client IP address
    #[serde(rename = "clientIP", skip_serializing_if = "String::is_empty")]
    pub client_ip: String,
    /// Client source port
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_port: String,
    /// Request body capture
    pub request_payload: Payload,
    /// Response body capture
    pub response_payload: Payload,
    /// Zero-padded 3-digit status string
    pub response_status: String,
    /// Flattened inbound request headers
    pub client_headers: HashMap<String, String>,
    /// Fields sourced from request headers via header mappings
    pub request_headers: HashMap<String, String>,
    /// Flattened response headers plus mapped fields
    pub response_headers: HashMap<String, String>,
    /// Fixed metadata flags
    pub metadata: Metadata,
}

impl AuditEvent {
    /// Create an event shell with a fresh `eventId`
    pub fn new(audit_source: impl Into<String>, audit_type: impl Into<String>) -> Self {
        Self {
            audit_source: audit_source.into(),
            audit_type: audit_type.into(),
            event_id: Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }
}

/// Populate the fields every flavour shares from the request
pub(crate) fn append_common_request_fields(ev: &mut AuditEvent, ctx: &RequestContext) {
    ev.generated_at = ctx
        .began_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    ev.method = ctx.method.clone();
    ev.path = ctx.path.clone();
    ev.query_string = ctx.query.clone();
    ev.client_ip = ctx.client_ip().to_string();
    ev.client_port = ctx.client_port().to_string();
    ev.client_headers = ctx.flat_headers.clone();
}

/// Populate the fields every flavour shares from the response
pub(crate) fn append_common_response_fields(
    ev: &mut AuditEvent,
    response_headers: &HashMap<String, String>,
    info: &ResponseInfo,
    spec: &AuditSpecification,
) {
    ev.response_status = format!("{:03}", info.status);
    ev.response_headers = response_headers.clone();
    apply_header_mappings(
        &mut ev.response_headers,
        spec,
        RESPONSE_HEADERS_SECTION,
        |header| {
            response_headers
                .get(&format!("hdr-{header}"))
                .map(String::as_str)
        },
    );
}

/// Record the request body capture
///
/// The length is always the true body length. Contents are recorded only
/// when the body-capture filters allow it, after any masking applies.
pub(crate) fn add_request_payload(
    ev: &mut AuditEvent,
    ctx: &RequestContext,
    spec: &AuditSpecification,
) {
    let Some(body) = &ctx.body else {
        return;
    };
    ev.request_payload.length = body.len() as u64;
    if body.is_empty() || !spec.captures_body(ctx) {
        return;
    }

    let text = String::from_utf8_lossy(body);
    let content_type = ctx.header("content-type").unwrap_or_default();
    ev.request_payload.contents = Some(match spec.obfuscation.apply(content_type, &text) {
        Some(masked) => masked,
        None => text.into_owned(),
    });
}

/// Record the response body capture
///
/// Contents are trimmed of surrounding whitespace; the length keeps the
/// captured entity's untrimmed byte count.
pub(crate) fn add_response_payload(ev: &mut AuditEvent, info: &ResponseInfo) {
    ev.response_payload.length = info.entity.len() as u64;
    let text = String::from_utf8_lossy(&info.entity);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        ev.response_payload.contents = Some(trimmed.to_string());
    }
}

/// Copy request-header mappings into the event
pub(crate) fn apply_request_header_mappings(
    ev: &mut AuditEvent,
    ctx: &RequestContext,
    spec: &AuditSpecification,
) {
    let fields = &mut ev.request_headers;
    apply_header_mappings(fields, spec, REQUEST_HEADERS_SECTION, |header| {
        ctx.header(header)
    });
}

fn apply_header_mappings<'a>(
    fields: &mut HashMap<String, String>,
    spec: &AuditSpecification,
    section: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) {
    let Some(mappings) = spec.header_mappings.get(section) else {
        return;
    };
    for (field, header) in mappings {
        if let Some(value) = lookup(&header.to_ascii_lowercase()) {
            if !value.is_empty() {
                fields.insert(field.clone(), value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_has_fresh_id() {
        let a = AuditEvent::new("source", "type");
        let b = AuditEvent::new("source", "type");
        assert_ne!(a.event_id, b.event_id);
        Uuid::parse_str(&a.event_id).unwrap();
    }

    #[test]
    fn test_metadata_defaults_to_published() {
        let ev = AuditEvent::new("s", "t");
        assert!(ev.metadata.published_by_traefik);
    }

    #[test]
    fn test_status_is_zero_padded() {
        let mut ev = AuditEvent::new("s", "t");
        let info = ResponseInfo {
            status: 7,
            ..Default::default()
        };
        append_common_response_fields(
            &mut ev,
            &HashMap::new(),
            &info,
            &AuditSpecification::default(),
        );
        assert_eq!(ev.response_status, "007");
    }
}
