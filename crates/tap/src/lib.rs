//! Audit tap middleware
//!
//! A tower layer that observes every request/response pair flowing through
//! the proxy and emits one audit event per completed transaction. The tap
//! is a passive observer: it never changes what the client or the upstream
//! sees, and no audit failure ever affects the proxied response.
//!
//! # Per-request flow
//!
//! 1. Consult the exclusion/inclusion filters; excluded requests are
//!    forwarded untouched.
//! 2. Construct the configured event flavour, buffer the request body
//!    (reinstating it for the upstream) and append request metadata.
//! 3. Forward to the inner service; wrap the response body so it is
//!    captured (up to the entity cap) while streaming to the client.
//! 4. When the response completes, append response metadata, enforce size
//!    constraints, encode, and offer the event to every sink.
//!
//! Everything on the request path is CPU-bound; the only awaits are the
//! inner service call and the request-body read.
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_file("tapwire.toml")?;
//! config.validate()?;
//!
//! let sinks = select_sinks(&config.audit)?;
//! let audit = AuditLayer::from_config(&config.audit, sinks)?;
//!
//! let app = Router::new()
//!     .route("/{*path}", any(proxy_handler))
//!     .layer(audit)
//!     .layer(RequestIdLayer::from_config(&config.audit));
//! ```

mod capture;
mod error;
mod request_id;

pub use error::{Result, TapError};
pub use request_id::{generate_request_id, RequestIdLayer, RequestIdService};

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Request, Response};
use tower::{Layer, Service};
use tracing::warn;

use tapwire_config::{parse_size, AuditConfig, ProxyingFor};
use tapwire_events::{
    AuditConstraints, AuditSpecification, Auditer, Clock, RequestContext, SystemClock,
};
use tapwire_sinks::AuditSink;

use capture::{AuditFinalizer, CaptureBody};

/// Which event flavour the tap constructs
#[derive(Debug, Clone)]
enum EventFlavour {
    Api {
        audit_source: String,
        audit_type: String,
    },
    Rate {
        audit_source: String,
        audit_type: String,
    },
}

/// Shared, immutable tap state
pub(crate) struct TapState {
    pub(crate) spec: AuditSpecification,
    pub(crate) constraints: AuditConstraints,
    pub(crate) max_entity_length: usize,
    pub(crate) sinks: Vec<Arc<dyn AuditSink>>,
    pub(crate) clock: Arc<dyn Clock>,
    flavour: EventFlavour,
}

impl TapState {
    pub(crate) fn new_auditer(&self) -> Auditer {
        match &self.flavour {
            EventFlavour::Api {
                audit_source,
                audit_type,
            } => Auditer::api(audit_source.clone(), audit_type.clone()),
            EventFlavour::Rate {
                audit_source,
                audit_type,
            } => Auditer::rate(audit_source.clone(), audit_type.clone()),
        }
    }
}

/// Tower layer that installs the audit tap
#[derive(Clone)]
pub struct AuditLayer {
    state: Arc<TapState>,
}

impl AuditLayer {
    /// Build the tap from configuration, auditing into the given sinks
    ///
    /// Uses the wall clock; see [`Self::from_config_with_clock`] to inject
    /// one.
    pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> Result<Self> {
        Self::from_config_with_clock(config, sinks, Arc::new(SystemClock))
    }

    /// Build the tap with an injected clock
    pub fn from_config_with_clock(
        config: &AuditConfig,
        sinks: Vec<Arc<dyn AuditSink>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let spec = AuditSpecification::from_config(config)?;
        let constraints = AuditConstraints {
            max_audit_length: parse_size(&config.max_audit_length)?,
            max_payload_contents_length: parse_size(&config.max_payload_contents_length)?,
        };
        let max_entity_length = parse_size(&config.max_entity_length)? as usize;

        let flavour = match config.proxying_for {
            ProxyingFor::Api => EventFlavour::Api {
                audit_source: config.audit_source.clone(),
                audit_type: config.audit_type.clone(),
            },
            ProxyingFor::Rate => EventFlavour::Rate {
                audit_source: config.audit_source.clone(),
                audit_type: config.audit_type.clone(),
            },
        };

        Ok(Self {
            state: Arc::new(TapState {
                spec,
                constraints,
                max_entity_length,
                sinks,
                clock,
                flavour,
            }),
        })
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// The tap service wrapping an inner tower service
#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    state: Arc<TapState>,
}

impl<S> Service<Request<Body>> for AuditService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Response<Body>, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let clone = self.inner.clone();
        // the original, poll_ready-ed service does this request
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let remote_addr = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|connect| connect.0);
            let (parts, body) = req.into_parts();
            let ctx = RequestContext::from_parts(&parts, remote_addr, state.clock.as_ref());

            if !state.spec.audits(&ctx) {
                return inner.call(Request::from_parts(parts, body)).await;
            }

            // buffer the body so the event records its true length; the
            // upstream gets an identical request
            let (body, buffered) = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => (Body::from(bytes.clone()), bytes),
                Err(e) => {
                    warn!(error = %e, "failed to buffer request body; auditing without payload");
                    (Body::empty(), Bytes::new())
                }
            };
            let ctx = ctx.with_body(buffered);

            let mut auditer = state.new_auditer();
            auditer.append_request(&ctx, &state.spec);

            let response = inner.call(Request::from_parts(parts, body)).await?;

            let (parts, body) = response.into_parts();
            let finalizer = AuditFinalizer::new(auditer, Arc::clone(&state), &parts);
            let body = Body::new(CaptureBody::new(body, state.max_entity_length, finalizer));
            Ok(Response::from_parts(parts, body))
        })
    }
}
