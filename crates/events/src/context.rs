//! Per-request context
//!
//! Everything the event model needs to know about the inbound request,
//! derived once at tap time and immutable afterwards.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::request::Parts;

use crate::clock::Clock;
use crate::headers::{flatten_headers, HEADER_PREFIX};

/// Immutable snapshot of an inbound request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method, upper-case
    pub method: String,
    /// Request host (authority or `Host` header)
    pub host: String,
    /// Request path
    pub path: String,
    /// Raw query string, without the `?`
    pub query: String,
    /// Peer address as `ip:port`, empty when unknown
    pub remote_addr: String,
    /// When the tap first saw the request (UTC)
    pub began_at: DateTime<Utc>,
    /// Flattened request headers (`hdr-` prefixed, lower-cased)
    pub flat_headers: HashMap<String, String>,
    /// Buffered request body, when one was read
    pub body: Option<Bytes>,
}

impl RequestContext {
    /// Build a context from request parts
    ///
    /// `remote_addr` is the peer socket address when the host server
    /// exposes one. The body is attached separately via [`Self::with_body`]
    /// once it has been buffered.
    pub fn from_parts(parts: &Parts, remote_addr: Option<SocketAddr>, clock: &dyn Clock) -> Self {
        let host = parts
            .uri
            .host()
            .map(str::to_string)
            .or_else(|| {
                parts
                    .headers
                    .get(http::header::HOST)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            })
            .unwrap_or_default();

        Self {
            method: parts.method.as_str().to_string(),
            host,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            remote_addr: remote_addr.map(|a| a.to_string()).unwrap_or_default(),
            began_at: clock.now(),
            flat_headers: flatten_headers(&parts.headers, HEADER_PREFIX),
            body: None,
        }
    }

    /// Attach the buffered request body
    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a flattened request header by its plain name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.flat_headers
            .get(&format!("{HEADER_PREFIX}{}", name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// The client IP, split from the peer address
    pub fn client_ip(&self) -> &str {
        match self.remote_addr.rsplit_once(':') {
            Some((ip, _)) => ip,
            None => &self.remote_addr,
        }
    }

    /// The client port, split from the peer address
    pub fn client_port(&self) -> &str {
        self.remote_addr
            .rsplit_once(':')
            .map(|(_, port)| port)
            .unwrap_or_default()
    }
}
