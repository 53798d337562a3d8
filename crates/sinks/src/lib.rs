//! Audit event sinks
//!
//! A sink is a destination for encoded audit events. The tap offers every
//! event to every configured sink; a sink must accept or drop without
//! blocking the request path.
//!
//! # Sink types
//!
//! - [`AsyncHttpSink`] - the production sink: a bounded in-memory channel
//!   feeds a disk-backed persistent queue, drained by a pool of producers
//!   POSTing to a remote receiver.
//! - [`FileSink`] - appends events as JSON lines to a local file.
//! - [`BlackholeSink`] - counts and discards (benchmarks, smoke tests).
//!
//! # Failure policy
//!
//! Audit delivery is an observability concern: no sink error ever
//! propagates to the proxied request. Undeliverable events are logged with
//! a single canonical prefix and dropped.

mod blackhole;
mod client;
mod error;
mod file;
mod http_async;

pub use blackhole::BlackholeSink;
pub use client::{build_client, CERTIFICATE_PATH_ENV, DEFAULT_CLIENT_TIMEOUT};
pub use error::{Result, SinkError};
pub use file::FileSink;
pub use http_async::{
    AsyncHttpSink, HttpSinkConfig, HttpSinkMetrics, HttpSinkMetricsSnapshot,
    UNDELIVERED_MESSAGE_PREFIX,
};

use std::sync::Arc;

use async_trait::async_trait;
use tapwire_config::{AuditConfig, SinkType};
use tapwire_events::Encoded;

/// A destination for encoded audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Offer an event to the sink
    ///
    /// Must return promptly: implementations buffer or drop, never block
    /// on I/O owned by another component.
    fn audit(&self, encoded: Encoded) -> Result<()>;

    /// Release resources, flushing or re-queueing in-flight work
    async fn close(&self) -> Result<()>;

    /// Sink name for logs
    fn name(&self) -> &'static str;
}

/// Build the sinks selected by configuration
///
/// # Errors
///
/// Fails on unusable sink settings (missing endpoint, queue directory
/// that cannot be created, broken TLS material).
pub fn select_sinks(config: &AuditConfig) -> Result<Vec<Arc<dyn AuditSink>>> {
    let sink: Arc<dyn AuditSink> = match config.sink_type {
        SinkType::Http => Arc::new(AsyncHttpSink::new(HttpSinkConfig::from_audit(config)?)?),
        SinkType::File => Arc::new(FileSink::create(&config.endpoint)?),
        SinkType::Blackhole => Arc::new(BlackholeSink::default()),
    };
    Ok(vec![sink])
}

impl HttpSinkConfig {
    /// Derive the HTTP sink settings from the audit configuration
    pub fn from_audit(config: &AuditConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(SinkError::InvalidConfig("endpoint is required".into()));
        }
        if config.disk_store_path.is_empty() {
            return Err(SinkError::InvalidConfig(
                "disk_store_path is required".into(),
            ));
        }

        let mut sink = HttpSinkConfig::new(&config.endpoint, config.proxying_for.as_str())
            .with_num_producers(config.num_producers)
            .with_channel_length(config.channel_length)
            .with_disk_store_path(&config.disk_store_path)
            .with_delivery_timeout(std::time::Duration::from_millis(config.delivery_timeout_ms));
        if !config.client_id.is_empty() {
            sink = sink.with_client_id(&config.client_id);
        }
        if !config.client_version.is_empty() {
            sink = sink.with_client_version(&config.client_version);
        }
        if !config.encrypt_secret.is_empty() {
            sink = sink.with_encrypt_secret(&config.encrypt_secret);
        }
        Ok(sink)
    }
}
