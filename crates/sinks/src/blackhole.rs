//! Blackhole sink
//!
//! Counts and discards every event. Used for benchmarking the tap without
//! delivery overhead and for configurations that want auditing disabled
//! without touching the middleware stack.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tapwire_events::Encoded;

use crate::error::Result;
use crate::AuditSink;

/// Sink that discards all events
#[derive(Debug, Default)]
pub struct BlackholeSink {
    events_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl BlackholeSink {
    /// Events discarded so far
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    /// Bytes discarded so far
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuditSink for BlackholeSink {
    fn audit(&self, encoded: Encoded) -> Result<()> {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(encoded.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "blackhole"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_and_discards() {
        let sink = BlackholeSink::default();
        sink.audit(Encoded::new(&b"12345"[..])).unwrap();
        sink.audit(Encoded::new(&b"678"[..])).unwrap();

        assert_eq!(sink.events_received(), 2);
        assert_eq!(sink.bytes_received(), 8);
        sink.close().await.unwrap();
    }
}
