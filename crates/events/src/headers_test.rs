//! Tests for header flattening

use super::*;
use http::header::{HeaderName, HeaderValue};

fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.append(
            name.parse::<HeaderName>().unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    headers
}

#[test]
fn test_lower_cases_and_prefixes() {
    let headers = header_map(&[("Request-ID", "R123"), ("Session-ID", "S123")]);
    let flat = flatten_headers(&headers, "hdr-");

    assert_eq!(flat["hdr-request-id"], "R123");
    assert_eq!(flat["hdr-session-id"], "S123");
    assert_eq!(flat.len(), 2);
}

#[test]
fn test_drops_hop_by_hop() {
    let headers = header_map(&[
        ("Keep-Alive", "true"),
        ("Connection", "1"),
        ("Proxy-Authenticate", "1"),
        ("Proxy-Authorization", "1"),
        ("TE", "1"),
        ("Trailers", "1"),
        ("Transfer-Encoding", "1"),
        ("Upgrade", "1"),
        ("Content-Length", "123"),
    ]);
    let flat = flatten_headers(&headers, "hdr-");

    assert_eq!(flat.len(), 1);
    assert_eq!(flat["hdr-content-length"], "123");
}

#[test]
fn test_simplifies_cookies() {
    let headers = header_map(&[("Cookie", "a=1; b=2"), ("Cookie", "c=3")]);
    let flat = flatten_headers(&headers, "hdr-");

    assert_eq!(flat["hdr-cookie"], "a=1,b=2,c=3");
}

#[test]
fn test_joins_repeated_headers() {
    let headers = header_map(&[("Accept", "text/plain"), ("Accept", "text/html")]);
    let flat = flatten_headers(&headers, "hdr-");

    assert_eq!(flat["hdr-accept"], "text/plain,text/html");
}

#[test]
fn test_flattening_is_idempotent() {
    let headers = header_map(&[
        ("Request-ID", "R123"),
        ("Cookie", "a=1; b=2"),
        ("Accept", "text/plain"),
    ]);
    let once = flatten_headers(&headers, "");

    let mut again = HeaderMap::new();
    for (name, value) in &once {
        again.insert(
            name.parse::<HeaderName>().unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    let twice = flatten_headers(&again, "");

    assert_eq!(once, twice);
}
