//! RATE audit events
//!
//! Unlike the API flavour, RATE events do not require a fixed
//! `auditSource`/`auditType`: values missing from configuration are derived
//! from request metadata when the request is appended.

use std::collections::HashMap;

use serde::Serialize;

use crate::context::RequestContext;
use crate::event::{
    add_request_payload, add_response_payload, append_common_request_fields,
    append_common_response_fields, apply_request_header_mappings, AuditEvent, ResponseInfo,
};
use crate::specification::AuditSpecification;

#[cfg(test)]
#[path = "rate_test.rs"]
mod rate_test;

/// Audit type recorded when neither configuration nor request supply one
const DEFAULT_AUDIT_TYPE: &str = "RequestReceived";

/// The audit event created for RATE traffic
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RateAuditEvent {
    /// Common fields
    pub event: AuditEvent,
}

impl RateAuditEvent {
    /// Create a RATE event
    ///
    /// Either argument may be empty; missing values are filled from the
    /// request when it is appended.
    pub fn new(audit_source: impl Into<String>, audit_type: impl Into<String>) -> Self {
        Self {
            event: AuditEvent::new(audit_source, audit_type),
        }
    }

    /// Append information about the request to the event
    pub fn append_request(&mut self, ctx: &RequestContext, spec: &AuditSpecification) {
        append_common_request_fields(&mut self.event, ctx);
        if self.event.audit_source.is_empty() {
            self.event.audit_source = derive_audit_source(&ctx.host);
        }
        if self.event.audit_type.is_empty() {
            self.event.audit_type = DEFAULT_AUDIT_TYPE.to_string();
        }
        apply_request_header_mappings(&mut self.event, ctx, spec);
        add_request_payload(&mut self.event, ctx, spec);
    }

    /// Append information about the response to the event
    pub fn append_response(
        &mut self,
        response_headers: &HashMap<String, String>,
        info: &ResponseInfo,
        spec: &AuditSpecification,
    ) {
        append_common_response_fields(&mut self.event, response_headers, info, spec);
        add_response_payload(&mut self.event, info);
    }
}

/// The first dot-label of the request host, without any port
fn derive_audit_source(host: &str) -> String {
    host.split(':')
        .next()
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}
