//! Tests for event encoding

use super::*;
use crate::clock::FixedClock;
use crate::{AuditSpecification, Auditer, ResponseInfo};
use bytes::Bytes;
use chrono::DateTime;
use http::Request;
use std::collections::HashMap;
use std::net::SocketAddr;

fn encoded_event() -> serde_json::Value {
    let (parts, ()) = Request::builder()
        .method("GET")
        .uri("/a/b/c?d=1")
        .header("Host", "example.co.uk")
        .header("Request-ID", "R123")
        .body(())
        .unwrap()
        .into_parts();
    let addr: SocketAddr = "101.102.103.104:1234".parse().unwrap();
    let clock = FixedClock(DateTime::from_timestamp(1_000_000_000, 0).unwrap());
    let ctx = crate::RequestContext::from_parts(&parts, Some(addr), &clock)
        .with_body(Bytes::new());

    let spec = AuditSpecification::default();
    let mut auditer = Auditer::api("transaction-gateway", "RequestReceived");
    auditer.append_request(&ctx, &spec);

    let info = ResponseInfo {
        status: 404,
        size: 19,
        entity: Bytes::copy_from_slice(b"404 page not found\n"),
        completed_at: Some(clock.0),
    };
    auditer.append_response(&HashMap::new(), &info, &spec);

    let encoded = auditer.to_encoded().unwrap();
    serde_json::from_slice(encoded.as_bytes()).unwrap()
}

#[test]
fn test_required_wire_keys() {
    let value = encoded_event();

    assert_eq!(value["auditSource"], "transaction-gateway");
    assert_eq!(value["auditType"], "RequestReceived");
    assert_eq!(value["method"], "GET");
    assert_eq!(value["path"], "/a/b/c");
    assert_eq!(value["queryString"], "d=1");
    assert_eq!(value["responseStatus"], "404");
    assert_eq!(value["requestPayload"]["length"], 0);
    assert_eq!(value["responsePayload"]["length"], 19);
    assert_eq!(value["responsePayload"]["contents"], "404 page not found");
    assert_eq!(value["clientHeaders"]["hdr-request-id"], "R123");
    assert_eq!(value["metadata"]["publishedByTraefik"], true);

    uuid::Uuid::parse_str(value["eventId"].as_str().unwrap()).unwrap();
}

#[test]
fn test_generated_at_is_rfc3339_utc() {
    let value = encoded_event();
    assert_eq!(value["generatedAt"], "2001-09-09T01:46:40.000Z");
}

#[test]
fn test_optional_keys_omitted_when_empty() {
    let value = encoded_event();
    assert!(value.get("proxiedPath").is_none());
    assert!(value.get("authorisationToken").is_none());
}

#[test]
fn test_html_characters_survive() {
    #[derive(serde::Serialize)]
    struct Doc {
        contents: String,
    }
    let encoded = to_encoded(&Doc {
        contents: "<a href=\"x\">&</a>".into(),
    })
    .unwrap();
    let text = std::str::from_utf8(encoded.as_bytes()).unwrap();
    assert!(text.contains("<a href="));
    assert!(text.contains('&'));
    assert!(!text.contains("\\u003c"));
}

#[test]
fn test_encoded_length_matches_bytes() {
    let encoded = Encoded::new(vec![1u8, 2, 3]);
    assert_eq!(encoded.len(), 3);
    assert!(!encoded.is_empty());
    assert_eq!(encoded.as_bytes(), &[1, 2, 3]);
    assert_eq!(encoded.bytes().len(), 3);
}
