//! Asynchronous HTTP sink
//!
//! The production delivery path. Events take three hops:
//!
//! ```text
//! audit() ──try_send──▶ [bounded channel] ──ingest──▶ [disk queue] ──publish──▶ POST
//! ```
//!
//! The hot-path `audit()` call never blocks: a full channel is a logged
//! drop. Each of the `num_producers` producers runs two tasks - an ingest
//! loop moving events from the channel onto the persistent queue, and a
//! publish loop draining the queue into HTTP POSTs. The disk hop is what
//! survives restarts; the receiver being down costs only the events the
//! producers attempt while it is down.
//!
//! # Delivery contract
//!
//! `POST` to the configured endpoint with `Content-Length` set from the
//! encoded length and `User-Agent` set to the proxying-for tag. Any
//! transport error or status ≥ 300 is a failed delivery: logged with the
//! canonical missed-event prefix and not retried.
//!
//! # Shutdown
//!
//! `close()` cancels every producer. A producer holding an item it
//! dequeued but has not yet sent re-enqueues it before exiting; the
//! in-memory channel is not drained. The queue is closed last.

use std::fmt::Write as FmtWrite;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossfire::{MAsyncRx, MAsyncTx, TrySendError};
use sha2::{Digest, Sha256};
use tapwire_events::Encoded;
use tapwire_queue::DiskQueue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::build_client;
use crate::error::{Result, SinkError};
use crate::AuditSink;

#[cfg(test)]
#[path = "http_async_test.rs"]
mod http_async_test;

/// Canonical log prefix for events that will never reach the receiver
pub const UNDELIVERED_MESSAGE_PREFIX: &str =
    "DS_EventMissed_AuditFailureResponse audit item : ";

/// Sleep between polls of an empty queue
const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_millis(2);

/// Configuration for the asynchronous HTTP sink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Receiver URL
    pub endpoint: String,

    /// Role tag sent as the `User-Agent` of every delivery
    pub proxying_for: String,

    /// Number of producer pairs draining the queue
    pub num_producers: usize,

    /// In-memory channel capacity; zero accepts nothing
    pub channel_length: usize,

    /// Directory for the persistent queue
    pub disk_store_path: PathBuf,

    /// Total per-delivery timeout
    pub delivery_timeout: Duration,

    /// Optional `X-Client-ID` delivery header
    pub client_id: Option<String>,

    /// Optional `X-Client-Version` delivery header
    pub client_version: Option<String>,

    /// When set, missed-event logs carry a keyed digest instead of the payload
    pub encrypt_secret: Option<String>,
}

impl HttpSinkConfig {
    /// Create a config for the given receiver and role tag
    pub fn new(endpoint: impl Into<String>, proxying_for: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            proxying_for: proxying_for.into(),
            num_producers: 4,
            channel_length: 1000,
            disk_store_path: PathBuf::from("audit-queue"),
            delivery_timeout: crate::client::DEFAULT_CLIENT_TIMEOUT,
            client_id: None,
            client_version: None,
            encrypt_secret: None,
        }
    }

    /// Set the number of producers
    #[must_use]
    pub fn with_num_producers(mut self, num_producers: usize) -> Self {
        self.num_producers = num_producers;
        self
    }

    /// Set the in-memory channel capacity
    #[must_use]
    pub fn with_channel_length(mut self, channel_length: usize) -> Self {
        self.channel_length = channel_length;
        self
    }

    /// Set the persistent queue directory
    #[must_use]
    pub fn with_disk_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_store_path = path.into();
        self
    }

    /// Set the total per-delivery timeout
    #[must_use]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the `X-Client-ID` delivery header
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the `X-Client-Version` delivery header
    #[must_use]
    pub fn with_client_version(mut self, client_version: impl Into<String>) -> Self {
        self.client_version = Some(client_version.into());
        self
    }

    /// Digest missed-event logs with the given secret
    #[must_use]
    pub fn with_encrypt_secret(mut self, secret: impl Into<String>) -> Self {
        self.encrypt_secret = Some(secret.into());
        self
    }
}

/// Metrics for the asynchronous HTTP sink
#[derive(Debug, Default)]
pub struct HttpSinkMetrics {
    /// Events offered via `audit()`
    pub events_received: AtomicU64,

    /// Events persisted to the disk queue
    pub events_enqueued: AtomicU64,

    /// Events accepted by the receiver
    pub events_delivered: AtomicU64,

    /// Events dropped (channel full, delivery failure)
    pub events_missed: AtomicU64,

    /// Disk queue enqueue failures
    pub queue_errors: AtomicU64,
}

impl HttpSinkMetrics {
    #[inline]
    fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_missed(&self) {
        self.events_missed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_queue_error(&self) {
        self.queue_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot
    pub fn snapshot(&self) -> HttpSinkMetricsSnapshot {
        HttpSinkMetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_missed: self.events_missed.load(Ordering::Relaxed),
            queue_errors: self.queue_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSinkMetricsSnapshot {
    pub events_received: u64,
    pub events_enqueued: u64,
    pub events_delivered: u64,
    pub events_missed: u64,
    pub queue_errors: u64,
}

/// Asynchronous HTTP sink with a disk-backed producer pool
#[derive(Debug)]
pub struct AsyncHttpSink {
    tx: MAsyncTx<Encoded>,
    channel_length: usize,
    queue: Arc<DiskQueue>,
    cancel: CancellationToken,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<HttpSinkMetrics>,
    digest: Option<EventDigest>,
}

impl AsyncHttpSink {
    /// Create the sink, opening its persistent queue from config
    ///
    /// Producers start immediately; a tokio runtime must be current.
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let queue = Arc::new(DiskQueue::open(&config.disk_store_path)?);
        Self::with_queue(config, queue)
    }

    /// Create the sink around an already opened queue
    pub fn with_queue(config: HttpSinkConfig, queue: Arc<DiskQueue>) -> Result<Self> {
        if config.num_producers == 0 {
            return Err(SinkError::InvalidConfig(
                "num_producers must be at least 1".into(),
            ));
        }

        let client = build_client(config.delivery_timeout)?;
        let (tx, rx) = crossfire::mpmc::bounded_async::<Encoded>(config.channel_length.max(1));
        let cancel = CancellationToken::new();
        let metrics = Arc::new(HttpSinkMetrics::default());
        let digest = config.encrypt_secret.as_deref().map(EventDigest::new);

        let mut workers = Vec::with_capacity(config.num_producers * 2);
        for id in 0..config.num_producers {
            let producer = Arc::new(HttpProducer {
                id,
                client: client.clone(),
                endpoint: config.endpoint.clone(),
                proxying_for: config.proxying_for.clone(),
                client_id: config.client_id.clone(),
                client_version: config.client_version.clone(),
                queue: Arc::clone(&queue),
                cancel: cancel.clone(),
                metrics: Arc::clone(&metrics),
                digest: digest.clone(),
            });
            workers.push(tokio::spawn(Arc::clone(&producer).ingest(rx.clone())));
            workers.push(tokio::spawn(producer.publish()));
        }

        info!(
            endpoint = %config.endpoint,
            producers = config.num_producers,
            channel_length = config.channel_length,
            queue_path = %config.disk_store_path.display(),
            "async http sink started"
        );

        Ok(Self {
            tx,
            channel_length: config.channel_length,
            queue,
            cancel,
            workers: parking_lot::Mutex::new(workers),
            metrics,
            digest,
        })
    }

    /// Sink metrics
    pub fn metrics(&self) -> &HttpSinkMetrics {
        &self.metrics
    }

    /// The shared persistent queue
    pub fn queue(&self) -> &Arc<DiskQueue> {
        &self.queue
    }
}

#[async_trait]
impl AuditSink for AsyncHttpSink {
    fn audit(&self, encoded: Encoded) -> Result<()> {
        self.metrics.record_received();

        if self.channel_length == 0 {
            handle_failed_event(&encoded, self.digest.as_ref());
            self.metrics.record_missed();
            return Ok(());
        }

        match self.tx.try_send(encoded) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(encoded)) | Err(TrySendError::Disconnected(encoded)) => {
                handle_failed_event(&encoded, self.digest.as_ref());
                self.metrics.record_missed();
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
        self.queue.close()?;

        let snapshot = self.metrics.snapshot();
        info!(
            received = snapshot.events_received,
            delivered = snapshot.events_delivered,
            missed = snapshot.events_missed,
            "async http sink closed"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http-async"
    }
}

/// One member of the producer pool
struct HttpProducer {
    id: usize,
    client: reqwest::Client,
    endpoint: String,
    proxying_for: String,
    client_id: Option<String>,
    client_version: Option<String>,
    queue: Arc<DiskQueue>,
    cancel: CancellationToken,
    metrics: Arc<HttpSinkMetrics>,
    digest: Option<EventDigest>,
}

impl HttpProducer {
    /// Move events from the in-memory channel onto the persistent queue
    async fn ingest(self: Arc<Self>, rx: MAsyncRx<Encoded>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = rx.recv() => {
                    let Ok(encoded) = received else { break };
                    match self.queue.enqueue(encoded.as_bytes()) {
                        Ok(()) => self.metrics.record_enqueued(),
                        Err(e) => {
                            error!(producer = self.id, error = %e, "failed to persist audit event");
                            handle_failed_event(&encoded, self.digest.as_ref());
                            self.metrics.record_queue_error();
                        }
                    }
                }
            }
        }
        debug!(producer = self.id, "ingest loop stopped");
    }

    /// Drain the persistent queue into HTTP deliveries
    async fn publish(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let item = match self.queue.dequeue() {
                Ok(Some(bytes)) => Encoded::from(bytes),
                Ok(None) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(EMPTY_QUEUE_BACKOFF) => continue,
                    }
                }
                Err(e) => {
                    if !self.cancel.is_cancelled() {
                        error!(producer = self.id, error = %e, "queue dequeue failed");
                    }
                    break;
                }
            };

            // the stop check sits between the dequeue and the send: a
            // cancelled producer re-enqueues the item it is holding
            if self.cancel.is_cancelled() {
                if let Err(e) = self.queue.enqueue(item.as_bytes()) {
                    error!(producer = self.id, error = %e, "failed to re-enqueue in-flight event");
                    handle_failed_event(&item, self.digest.as_ref());
                }
                break;
            }

            self.send(item).await;
        }
        debug!(producer = self.id, "publish loop stopped");
    }

    /// Deliver one event; failures are logged and not retried
    async fn send(&self, encoded: Encoded) {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_LENGTH, encoded.len())
            .header(reqwest::header::USER_AGENT, &self.proxying_for);
        if let Some(client_id) = &self.client_id {
            request = request.header("X-Client-ID", client_id);
        }
        if let Some(client_version) = &self.client_version {
            request = request.header("X-Client-Version", client_version);
        }

        match request.body(encoded.bytes()).send().await {
            Ok(response) if response.status().as_u16() < 300 => {
                // drain the body so the connection can be reused
                let _ = response.bytes().await;
                self.metrics.record_delivered();
            }
            Ok(response) => {
                debug!(
                    producer = self.id,
                    status = response.status().as_u16(),
                    "receiver rejected audit event"
                );
                handle_failed_event(&encoded, self.digest.as_ref());
                self.metrics.record_missed();
            }
            Err(e) => {
                debug!(producer = self.id, error = %e, "audit delivery failed");
                handle_failed_event(&encoded, self.digest.as_ref());
                self.metrics.record_missed();
            }
        }
    }
}

/// Keyed digest for missed-event logging
///
/// With a secret configured, undeliverable payloads are logged as a
/// SHA-256 digest keyed by the secret rather than in the clear.
#[derive(Clone)]
struct EventDigest {
    secret: String,
}

impl EventDigest {
    fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    fn digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(payload);
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2 + 7);
        hex.push_str("sha256:");
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

impl std::fmt::Debug for EventDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDigest").finish_non_exhaustive()
    }
}

/// Log an event that will never reach the receiver
fn handle_failed_event(encoded: &Encoded, digest: Option<&EventDigest>) {
    match digest {
        Some(digest) => warn!(
            "{}{}",
            UNDELIVERED_MESSAGE_PREFIX,
            digest.digest(encoded.as_bytes())
        ),
        None => warn!(
            "{}{}",
            UNDELIVERED_MESSAGE_PREFIX,
            String::from_utf8_lossy(encoded.as_bytes())
        ),
    }
}
