//! Size-constraint enforcement
//!
//! Audit events must fit the receiver's limits. Payload contents are
//! sacrificable: when the combined request/response contents exceed the
//! payload bound, the larger side is cleared first, then the smaller side
//! if the remainder still exceeds the bound. Payload lengths are kept so
//! consumers can see what was dropped. The whole-event bound is checked
//! against the encoded form by [`crate::Auditer::enforce_constraints`].

use crate::event::AuditEvent;

#[cfg(test)]
#[path = "constraints_test.rs"]
mod constraints_test;

/// Per-event size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditConstraints {
    /// Maximum encoded event size; larger events are dropped
    pub max_audit_length: u64,
    /// Maximum combined request + response contents size
    pub max_payload_contents_length: u64,
}

impl Default for AuditConstraints {
    fn default() -> Self {
        Self {
            max_audit_length: 100_000,
            max_payload_contents_length: 96_000,
        }
    }
}

/// Clear payload contents until they fit the combined bound
pub(crate) fn enforce_precedent(ev: &mut AuditEvent, constraints: &AuditConstraints) {
    let request_len = contents_len(&ev.request_payload.contents);
    let response_len = contents_len(&ev.response_payload.contents);
    if request_len + response_len <= constraints.max_payload_contents_length {
        return;
    }

    let (larger, smaller) = if response_len >= request_len {
        (&mut ev.response_payload, &mut ev.request_payload)
    } else {
        (&mut ev.request_payload, &mut ev.response_payload)
    };

    larger.contents = None;
    if contents_len(&smaller.contents) > constraints.max_payload_contents_length {
        smaller.contents = None;
    }
}

fn contents_len(contents: &Option<String>) -> u64 {
    contents.as_ref().map_or(0, |s| s.len() as u64)
}
