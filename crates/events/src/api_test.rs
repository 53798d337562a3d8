//! Tests for API audit events

use super::*;
use crate::clock::FixedClock;
use crate::constraints::AuditConstraints;
use bytes::Bytes;
use chrono::DateTime;
use http::Request;
use std::net::SocketAddr;
use tapwire_config::AuditConfig;

fn fixed_clock() -> FixedClock {
    FixedClock(DateTime::from_timestamp(1_000_000_000, 0).unwrap())
}

fn request_ctx(uri: &str, headers: &[(&str, &str)], body: Option<&str>) -> RequestContext {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Host", "example.co.uk");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    let addr: SocketAddr = "101.102.103.104:1234".parse().unwrap();
    let ctx = RequestContext::from_parts(&parts, Some(addr), &fixed_clock());
    match body {
        Some(b) => ctx.with_body(Bytes::copy_from_slice(b.as_bytes())),
        None => ctx.with_body(Bytes::new()),
    }
}

fn masking_spec() -> AuditSpecification {
    let config = AuditConfig {
        mask_fields: vec!["password".into(), "secret".into()],
        mask_value: "@@@".into(),
        ..Default::default()
    };
    AuditSpecification::from_config(&config).unwrap()
}

#[test]
fn test_api_audit_event() {
    let request_body = r#"{"foo":"bar","baz":"biff"}"#;
    let response_body = r#"{"respFoo":"respBar"}"#;

    let mut ev = ApiAuditEvent::new("transaction-gateway", "RequestReceived");
    let ctx = request_ctx(
        "/some/api/resource?p1=v1",
        &[("Authorization", "auth456")],
        Some(request_body),
    );
    let spec = AuditSpecification::default();
    ev.append_request(&ctx, &spec);

    let mut response_headers = std::collections::HashMap::new();
    response_headers.insert("hdr-content-type".to_string(), "text/plain".to_string());
    let info = ResponseInfo {
        status: 404,
        size: 101,
        entity: Bytes::copy_from_slice(response_body.as_bytes()),
        completed_at: Some(fixed_clock().0),
    };
    ev.append_response(&response_headers, &info, &spec);

    assert_eq!(ev.event.method, "POST");
    assert_eq!(ev.event.path, "/some/api/resource");
    assert_eq!(ev.event.proxied_path, "");
    assert_eq!(ev.event.query_string, "p1=v1");
    assert_eq!(ev.authorisation_token, "auth456");
    assert_eq!(ev.event.client_ip, "101.102.103.104");
    assert_eq!(ev.event.client_port, "1234");

    assert_eq!(ev.event.request_payload.length, request_body.len() as u64);
    assert_eq!(
        ev.event.request_payload.contents.as_deref(),
        Some(request_body)
    );

    assert_eq!(ev.event.response_payload.length, response_body.len() as u64);
    assert_eq!(
        ev.event.response_payload.contents.as_deref(),
        Some(response_body)
    );

    assert_eq!(ev.event.response_status, "404");
    assert_eq!(ev.event.response_headers["hdr-content-type"], "text/plain");

    let mut auditer = crate::Auditer::Api(ev);
    assert!(auditer.enforce_constraints(&AuditConstraints::default()));
}

#[test]
fn test_gateway_prefix_rewrites_path() {
    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/current/api/resource?p1=v1",
        &[("X-Forwarded-Prefix", "/the/actual/service/")],
        None,
    );
    ev.append_request(&ctx, &AuditSpecification::default());

    assert_eq!(ev.event.path, "/the/actual/service/api/resource");
    assert_eq!(ev.event.proxied_path, "/current/api/resource");
    assert_eq!(ev.event.query_string, "p1=v1");
}

#[test]
fn test_gateway_prefix_without_trailing_slash() {
    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/current/api/resource",
        &[("X-Forwarded-Prefix", "/the/actual/service")],
        None,
    );
    ev.append_request(&ctx, &AuditSpecification::default());

    assert_eq!(ev.event.path, "/the/actual/service/api/resource");
}

#[test]
fn test_rewrite_only_applies_to_leading_prefix() {
    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/future/current/api/resource?p1=v1",
        &[("X-Forwarded-Prefix", "/the/actual/service/")],
        None,
    );
    ev.append_request(&ctx, &AuditSpecification::default());

    assert_eq!(ev.event.path, "/future/current/api/resource");
    assert_eq!(ev.event.proxied_path, "");
    assert_eq!(ev.event.query_string, "p1=v1");
}

#[test]
fn test_form_encoded_content_masking() {
    let request_body = "say=Hi&password=ishouldbesecret&secret=notforyoureyes&to=Dave";

    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/some/api/resource?p1=v1",
        &[(
            "Content-Type",
            "application/x-www-form-urlencoded; charset=ISO-8859-1",
        )],
        Some(request_body),
    );
    ev.append_request(&ctx, &masking_spec());

    assert_eq!(ev.event.request_payload.length, 61);
    assert_eq!(
        ev.event.request_payload.contents.as_deref(),
        Some("say=Hi&password=@@@&secret=@@@&to=Dave")
    );
}

#[test]
fn test_json_content_masking() {
    let request_body = "{\n\t\"password\": \"keepmesecret\",\n\t\"foo\": \"bar\",\n\t\"secret\": \"notforyoureyes\",\n\t\"baz\": \"phew\"\n}";
    let expected = "{\n\t\"password\": \"@@@\",\n\t\"foo\": \"bar\",\n\t\"secret\": \"@@@\",\n\t\"baz\": \"phew\"\n}";

    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/some/api/resource?p1=v1",
        &[("Content-Type", "application/json; charset=UTF-8")],
        Some(request_body),
    );
    ev.append_request(&ctx, &masking_spec());

    assert_eq!(ev.event.request_payload.length, request_body.len() as u64);
    assert_eq!(ev.event.request_payload.contents.as_deref(), Some(expected));
}

#[test]
fn test_payload_length_survives_masking() {
    let request_body = "password=ishouldbesecret";
    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx(
        "/login",
        &[("Content-Type", "application/x-www-form-urlencoded")],
        Some(request_body),
    );
    ev.append_request(&ctx, &masking_spec());

    // the recorded length is the unmasked body length
    assert_eq!(ev.event.request_payload.length, request_body.len() as u64);
    assert_ne!(
        ev.event.request_payload.contents.as_deref().unwrap().len(),
        request_body.len()
    );
}

#[test]
fn test_new_api_event_carries_source_and_type() {
    let ev = ApiAuditEvent::new("ping", "pong");
    assert_eq!(ev.event.audit_source, "ping");
    assert_eq!(ev.event.audit_type, "pong");
}

#[test]
fn test_response_entity_is_trimmed_but_length_is_not() {
    let mut ev = ApiAuditEvent::new("s", "t");
    let ctx = request_ctx("/a", &[], None);
    let spec = AuditSpecification::default();
    ev.append_request(&ctx, &spec);

    let info = ResponseInfo {
        status: 404,
        size: 19,
        entity: Bytes::copy_from_slice(b"404 page not found\n"),
        completed_at: Some(fixed_clock().0),
    };
    ev.append_response(&std::collections::HashMap::new(), &info, &spec);

    assert_eq!(ev.event.response_payload.length, 19);
    assert_eq!(
        ev.event.response_payload.contents.as_deref(),
        Some("404 page not found")
    );
}
