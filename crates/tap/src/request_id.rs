//! Request-id middleware
//!
//! Ensures every request entering the proxy carries an `X-Request-ID`. An
//! existing id is preserved only when forwarding is configured; otherwise
//! a fresh UUIDv4 is generated, `s`-prefixed, with an optional label:
//! `s-<uuid>` or `s-<label>-<uuid>`.

use http::header::HeaderName;
use http::{HeaderValue, Request};
use tower::{Layer, Service};
use uuid::Uuid;

use tapwire_config::AuditConfig;

/// The header the middleware manages
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Generate a request id
pub fn generate_request_id(label: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match label {
        Some(label) => format!("s-{label}-{id}"),
        None => format!("s-{id}"),
    }
}

/// Tower layer that stamps requests with an id
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer {
    forward_existing: bool,
    label: Option<String>,
}

impl RequestIdLayer {
    /// A layer that always generates fresh ids
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the layer settings from the audit configuration
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            forward_existing: config.forward_x_request_id,
            label: (!config.request_id_label.is_empty())
                .then(|| config.request_id_label.clone()),
        }
    }

    /// Keep an inbound `X-Request-ID` instead of generating one
    #[must_use]
    pub fn preserve_existing(mut self) -> Self {
        self.forward_existing = true;
        self
    }

    /// Carry a label inside generated ids
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            forward_existing: self.forward_existing,
            label: self.label.clone(),
        }
    }
}

/// Service produced by [`RequestIdLayer`]
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
    forward_existing: bool,
    label: Option<String>,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let keep = self.forward_existing && req.headers().contains_key(&REQUEST_ID_HEADER);
        if !keep {
            let id = generate_request_id(self.label.as_deref());
            if let Ok(value) = HeaderValue::from_str(&id) {
                req.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }
        self.inner.call(req)
    }
}
