//! API gateway audit events

use std::collections::HashMap;

use serde::Serialize;

use crate::context::RequestContext;
use crate::event::{
    add_request_payload, add_response_payload, append_common_request_fields,
    append_common_response_fields, apply_request_header_mappings, AuditEvent, ResponseInfo,
};
use crate::specification::AuditSpecification;

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

/// Path prefix that triggers the gateway rewrite rule
const GATEWAY_PATH_PREFIX: &str = "/current/";

/// Header carrying the real service prefix set by the gateway
const FORWARDED_PREFIX_HEADER: &str = "x-forwarded-prefix";

/// The audit event created for API calls
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAuditEvent {
    /// Common fields
    #[serde(flatten)]
    pub event: AuditEvent,
    /// Bearer credential presented by the caller
    #[serde(skip_serializing_if = "String::is_empty")]
    pub authorisation_token: String,
}

impl ApiAuditEvent {
    /// Create an API event with the configured source and type
    pub fn new(audit_source: impl Into<String>, audit_type: impl Into<String>) -> Self {
        Self {
            event: AuditEvent::new(audit_source, audit_type),
            authorisation_token: String::new(),
        }
    }

    /// Append information about the request to the event
    pub fn append_request(&mut self, ctx: &RequestContext, spec: &AuditSpecification) {
        append_common_request_fields(&mut self.event, ctx);
        self.authorisation_token = ctx.header("authorization").unwrap_or_default().to_string();
        self.rewrite_gateway_path(ctx);
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

    /// Apply the gateway prefix rewrite rule
    ///
    /// Requests arriving under `/current/` with a forwarded prefix are
    /// recorded under the real service path; the original path is kept in
    /// `proxiedPath`. Paths merely containing `/current/` are untouched.
    fn rewrite_gateway_path(&mut self, ctx: &RequestContext) {
        let Some(rest) = ctx.path.strip_prefix(GATEWAY_PATH_PREFIX) else {
            return;
        };
        let Some(prefix) = ctx.header(FORWARDED_PREFIX_HEADER) else {
            return;
        };
        if prefix.is_empty() {
            return;
        }

        self.event.proxied_path = ctx.path.clone();
        self.event.path = if prefix.ends_with('/') {
            format!("{prefix}{rest}")
        } else {
            format!("{prefix}/{rest}")
        };
    }
}
