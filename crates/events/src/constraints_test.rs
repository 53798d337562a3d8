//! Tests for constraint enforcement

use super::*;
use crate::event::Payload;
use crate::Auditer;

fn event_with_payloads(request: Option<&str>, response: Option<&str>) -> AuditEvent {
    let mut ev = AuditEvent::new("source", "type");
    ev.request_payload = Payload {
        length: request.map_or(0, |s| s.len() as u64),
        contents: request.map(str::to_string),
    };
    ev.response_payload = Payload {
        length: response.map_or(0, |s| s.len() as u64),
        contents: response.map(str::to_string),
    };
    ev
}

fn bounds(max_payload: u64) -> AuditConstraints {
    AuditConstraints {
        max_audit_length: 100_000,
        max_payload_contents_length: max_payload,
    }
}

#[test]
fn test_within_bounds_untouched() {
    let mut ev = event_with_payloads(Some("aaaa"), Some("bb"));
    enforce_precedent(&mut ev, &bounds(100));

    assert_eq!(ev.request_payload.contents.as_deref(), Some("aaaa"));
    assert_eq!(ev.response_payload.contents.as_deref(), Some("bb"));
}

#[test]
fn test_larger_side_cleared_first() {
    // request 10 bytes, response 4: combined 14 > 12, request goes
    let mut ev = event_with_payloads(Some("aaaaaaaaaa"), Some("bbbb"));
    enforce_precedent(&mut ev, &bounds(12));

    assert!(ev.request_payload.contents.is_none());
    assert_eq!(ev.response_payload.contents.as_deref(), Some("bbbb"));
    // lengths survive clearing
    assert_eq!(ev.request_payload.length, 10);
}

#[test]
fn test_both_sides_cleared_when_needed() {
    let mut ev = event_with_payloads(Some("aaaaaaaaaa"), Some("bbbbbbbb"));
    enforce_precedent(&mut ev, &bounds(6));

    assert!(ev.request_payload.contents.is_none());
    assert!(ev.response_payload.contents.is_none());
    assert_eq!(ev.request_payload.length, 10);
    assert_eq!(ev.response_payload.length, 8);
}

#[test]
fn test_response_preferred_for_clearing_on_tie() {
    let mut ev = event_with_payloads(Some("aaaa"), Some("bbbb"));
    enforce_precedent(&mut ev, &bounds(6));

    assert_eq!(ev.request_payload.contents.as_deref(), Some("aaaa"));
    assert!(ev.response_payload.contents.is_none());
}

#[test]
fn test_oversize_event_is_dropped() {
    let ev = event_with_payloads(Some("some contents"), None);
    let mut auditer = Auditer::Api(crate::ApiAuditEvent {
        event: ev,
        authorisation_token: String::new(),
    });

    let tiny = AuditConstraints {
        max_audit_length: 10,
        max_payload_contents_length: 96_000,
    };
    assert!(!auditer.enforce_constraints(&tiny));
    assert!(auditer.enforce_constraints(&AuditConstraints::default()));
}

#[test]
fn test_enforcement_is_monotonic() {
    // passing under tight bounds implies passing under any relaxed bounds
    let make = || {
        Auditer::Api(crate::ApiAuditEvent {
            event: event_with_payloads(Some("aaaa"), Some("bb")),
            authorisation_token: String::new(),
        })
    };

    let tight = AuditConstraints {
        max_audit_length: 1_000,
        max_payload_contents_length: 10,
    };
    let relaxed = AuditConstraints {
        max_audit_length: 10_000,
        max_payload_contents_length: 1_000,
    };

    assert!(make().enforce_constraints(&tight));
    assert!(make().enforce_constraints(&relaxed));
}

#[test]
fn test_defaults() {
    let constraints = AuditConstraints::default();
    assert_eq!(constraints.max_audit_length, 100_000);
    assert_eq!(constraints.max_payload_contents_length, 96_000);
}
