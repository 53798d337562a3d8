//! Audit event model
//!
//! The structured records emitted for every observed request, plus the
//! machinery that populates them: header flattening, request filtering,
//! payload obfuscation, size-constraint enforcement and JSON encoding.
//!
//! # Flavours
//!
//! Two event flavours share a common base and a common capability set
//! (`append_request`, `append_response`, `enforce_constraints`,
//! `to_encoded`), modelled as the [`Auditer`] enum:
//!
//! - [`ApiAuditEvent`] - API gateway auditing: fixed `auditSource` /
//!   `auditType`, authorisation-token capture and the forwarded-prefix
//!   path rewrite.
//! - [`RateAuditEvent`] - RATE auditing: `auditSource` / `auditType` may be
//!   derived from request metadata per event.
//!
//! # Example
//!
//! ```ignore
//! let spec = AuditSpecification::from_config(&config.audit)?;
//! let mut auditer = Auditer::api("transaction-gateway", "RequestReceived");
//!
//! auditer.append_request(&ctx, &spec);
//! // ... proxy the request ...
//! auditer.append_response(&response_headers, &info, &spec);
//!
//! if auditer.enforce_constraints(&constraints) {
//!     let encoded = auditer.to_encoded()?;
//!     for sink in &sinks {
//!         sink.audit(encoded.clone())?;
//!     }
//! }
//! ```

mod api;
mod clock;
mod constraints;
mod context;
mod encoder;
mod error;
mod event;
mod filter;
mod headers;
mod obfuscate;
mod rate;
mod specification;

pub use api::ApiAuditEvent;
pub use clock::{Clock, FixedClock, SystemClock};
pub use constraints::AuditConstraints;
pub use context::RequestContext;
pub use encoder::{to_encoded, Encoded};
pub use error::{EventError, Result};
pub use event::{AuditEvent, Metadata, Payload, ResponseInfo};
pub use filter::{CompiledFilter, FilterSet};
pub use headers::{flatten_headers, HEADER_PREFIX, HOP_BY_HOP_HEADERS};
pub use obfuscate::AuditObfuscation;
pub use rate::RateAuditEvent;
pub use specification::AuditSpecification;

use std::collections::HashMap;

/// The polymorphic event handle exposed to the tap
///
/// A tagged variant over the two event flavours. The tap drives every
/// variant through the same four capabilities and never inspects the tag.
#[derive(Debug, Clone)]
pub enum Auditer {
    /// API gateway flavour
    Api(ApiAuditEvent),
    /// RATE flavour
    Rate(RateAuditEvent),
}

impl Auditer {
    /// Create an API flavour auditer
    pub fn api(audit_source: impl Into<String>, audit_type: impl Into<String>) -> Self {
        Self::Api(ApiAuditEvent::new(audit_source, audit_type))
    }

    /// Create a RATE flavour auditer
    ///
    /// Empty `audit_source`/`audit_type` are filled in from request
    /// metadata when the request is appended.
    pub fn rate(audit_source: impl Into<String>, audit_type: impl Into<String>) -> Self {
        Self::Rate(RateAuditEvent::new(audit_source, audit_type))
    }

    /// Append information about the request to the event
    pub fn append_request(&mut self, ctx: &RequestContext, spec: &AuditSpecification) {
        match self {
            Self::Api(ev) => ev.append_request(ctx, spec),
            Self::Rate(ev) => ev.append_request(ctx, spec),
        }
    }

    /// Append information about the response to the event
    pub fn append_response(
        &mut self,
        response_headers: &HashMap<String, String>,
        info: &ResponseInfo,
        spec: &AuditSpecification,
    ) {
        match self {
            Self::Api(ev) => ev.append_response(response_headers, info, spec),
            Self::Rate(ev) => ev.append_response(response_headers, info, spec),
        }
    }

    /// Trim payloads to the configured bounds and check the encoded size
    ///
    /// Returns `false` when the event must be dropped (it encodes beyond
    /// `max_audit_length`, or encoding failed). Dropping is logged here;
    /// the caller just skips the sinks.
    pub fn enforce_constraints(&mut self, constraints: &AuditConstraints) -> bool {
        constraints::enforce_precedent(self.event_mut(), constraints);
        match self.to_encoded() {
            Ok(encoded) if encoded.len() as u64 <= constraints.max_audit_length => true,
            Ok(encoded) => {
                tracing::error!(
                    length = encoded.len(),
                    limit = constraints.max_audit_length,
                    event_id = %self.event().event_id,
                    "encoded audit event exceeds maximum length, dropping"
                );
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode audit event");
                false
            }
        }
    }

    /// Serialise the event to its wire form
    pub fn to_encoded(&self) -> Result<Encoded> {
        match self {
            Self::Api(ev) => to_encoded(ev),
            Self::Rate(ev) => to_encoded(ev),
        }
    }

    /// The common event fields
    pub fn event(&self) -> &AuditEvent {
        match self {
            Self::Api(ev) => &ev.event,
            Self::Rate(ev) => &ev.event,
        }
    }

    fn event_mut(&mut self) -> &mut AuditEvent {
        match self {
            Self::Api(ev) => &mut ev.event,
            Self::Rate(ev) => &mut ev.event,
        }
    }
}
