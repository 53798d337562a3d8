//! Header flattening
//!
//! Turns a multi-valued [`http::HeaderMap`] into the flat, lower-cased
//! string map the event model carries. Hop-by-hop headers are dropped,
//! cookies are canonicalised, and every key gains a caller-supplied prefix.

use std::collections::HashMap;

use http::HeaderMap;

#[cfg(test)]
#[path = "headers_test.rs"]
mod headers_test;

/// Prefix applied to flattened header keys
pub const HEADER_PREFIX: &str = "hdr-";

/// Headers that describe the connection, not the message
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "keep-alive",
    "connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Flatten a header map into prefixed single-string values
///
/// - Hop-by-hop names are dropped.
/// - Multiple `Cookie` values are split on `;`, trimmed, and joined into a
///   single comma-separated value.
/// - Other repeated headers are comma-joined in arrival order.
/// - Non-UTF-8 header bytes are replaced lossily.
pub fn flatten_headers(headers: &HeaderMap, prefix: &str) -> HashMap<String, String> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    let mut cookies: Vec<String> = Vec::new();

    for (name, value) in headers {
        let name = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        if name == "cookie" {
            cookies.extend(
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            );
        } else {
            grouped.entry(name).or_default().push(value);
        }
    }

    let mut flat: HashMap<String, String> = grouped
        .into_iter()
        .map(|(name, values)| (format!("{prefix}{name}"), values.join(",")))
        .collect();

    if !cookies.is_empty() {
        flat.insert(format!("{prefix}cookie"), cookies.join(","));
    }

    flat
}
