//! Tests for the request filter engine

use super::*;
use crate::clock::FixedClock;
use chrono::DateTime;
use http::Request;
use std::net::SocketAddr;

fn ctx(uri: &str, headers: &[(&str, &str)]) -> RequestContext {
    let mut builder = Request::builder().uri(uri).header("Host", "example.co.uk");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    let addr: SocketAddr = "10.0.0.1:4242".parse().unwrap();
    let clock = FixedClock(DateTime::from_timestamp(1_000_000_000, 0).unwrap());
    RequestContext::from_parts(&parts, Some(addr), &clock)
}

fn option(header_name: &str) -> FilterOption {
    FilterOption {
        header_name: header_name.into(),
        ..Default::default()
    }
}

#[test]
fn test_starts_with_on_path() {
    let mut opt = option("path");
    opt.starts_with = vec!["/ping".into()];
    let filter = CompiledFilter::compile("healthcheck", &opt).unwrap();

    assert!(filter.matches(&ctx("/ping", &[])));
    assert!(filter.matches(&ctx("/ping/pong", &[])));
    assert!(!filter.matches(&ctx("/api/ping", &[])));
}

#[test]
fn test_ends_with_and_contains() {
    let mut opt = option("path");
    opt.ends_with = vec![".ico".into()];
    opt.contains = vec!["internal".into()];
    let filter = CompiledFilter::compile("assets", &opt).unwrap();

    assert!(filter.matches(&ctx("/favicon.ico", &[])));
    assert!(filter.matches(&ctx("/api/internal/users", &[])));
    assert!(!filter.matches(&ctx("/api/users", &[])));
}

#[test]
fn test_regex_match() {
    let mut opt = option("path");
    opt.matches = vec![r"^/v\d+/status$".into()];
    let filter = CompiledFilter::compile("status", &opt).unwrap();

    assert!(filter.matches(&ctx("/v2/status", &[])));
    assert!(!filter.matches(&ctx("/v2/status/extra", &[])));
}

#[test]
fn test_invalid_regex_is_an_error() {
    let mut opt = option("path");
    opt.matches = vec!["(".into()];
    let err = CompiledFilter::compile("broken", &opt).unwrap_err();
    assert!(matches!(err, EventError::InvalidPattern { .. }));
}

#[test]
fn test_host_source() {
    let mut opt = option("requesthost");
    opt.ends_with = vec![".co.uk".into()];
    let filter = CompiledFilter::compile("uk", &opt).unwrap();

    assert!(filter.matches(&ctx("/anything", &[])));
}

#[test]
fn test_header_source_falls_back_to_key() {
    let mut opt = FilterOption::default();
    opt.contains = vec!["curl".into()];
    let filter = CompiledFilter::compile("user-agent", &opt).unwrap();

    assert!(filter.matches(&ctx("/", &[("User-Agent", "curl/8.5")])));
    assert!(!filter.matches(&ctx("/", &[("User-Agent", "browser")])));
    // empty values never match
    assert!(!filter.matches(&ctx("/", &[])));
}

#[test]
fn test_disabled_option_never_matches() {
    let filter = CompiledFilter::compile("path", &option("path")).unwrap();
    assert!(!filter.enabled());
    assert!(!filter.matches(&ctx("/anything", &[])));
}

#[test]
fn test_filter_set_skips_disabled_options() {
    let mut options = HashMap::new();
    options.insert("noop".to_string(), option("path"));
    let set = FilterSet::compile(&options).unwrap();
    assert!(set.is_empty());

    let mut active = option("path");
    active.starts_with = vec!["/ping".into()];
    options.insert("healthcheck".to_string(), active);
    let set = FilterSet::compile(&options).unwrap();
    assert!(!set.is_empty());
    assert!(set.any_match(&ctx("/ping", &[])));
    assert!(!set.any_match(&ctx("/api", &[])));
}

#[test]
fn test_decision_is_pure() {
    let mut opt = option("path");
    opt.starts_with = vec!["/ping".into()];
    let filter = CompiledFilter::compile("healthcheck", &opt).unwrap();

    let request = ctx("/ping", &[]);
    for _ in 0..3 {
        assert!(filter.matches(&request));
    }
}
