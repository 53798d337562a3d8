//! Response capture
//!
//! Wraps the response body so the tap sees what the client receives.
//! Frames stream through unchanged; data is copied into a bounded buffer
//! (bytes past the cap are counted but not retained). When the stream
//! ends - or the body is dropped early by a disconnecting client - the
//! audit event is completed and offered to the sinks exactly once.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use http::response::Parts;
use http_body::{Frame, SizeHint};
use tracing::{error, warn};

use tapwire_events::{flatten_headers, Auditer, ResponseInfo, HEADER_PREFIX};

use crate::TapState;

/// Completes and emits the audit event when the response finishes
pub(crate) struct AuditFinalizer {
    auditer: Auditer,
    state: Arc<TapState>,
    status: u16,
    response_headers: HashMap<String, String>,
}

impl AuditFinalizer {
    pub(crate) fn new(auditer: Auditer, state: Arc<TapState>, parts: &Parts) -> Self {
        Self {
            auditer,
            state,
            status: parts.status.as_u16(),
            response_headers: flatten_headers(&parts.headers, HEADER_PREFIX),
        }
    }

    /// Append the response, enforce constraints, encode and fan out
    fn finish(mut self, size: u64, entity: Bytes) {
        let info = ResponseInfo {
            status: self.status,
            size,
            entity,
            completed_at: Some(self.state.clock.now()),
        };
        self.auditer
            .append_response(&self.response_headers, &info, &self.state.spec);

        if !self.auditer.enforce_constraints(&self.state.constraints) {
            return;
        }

        match self.auditer.to_encoded() {
            Ok(encoded) => {
                for sink in &self.state.sinks {
                    if let Err(e) = sink.audit(encoded.clone()) {
                        warn!(sink = sink.name(), error = %e, "sink rejected audit event");
                    }
                }
            }
            Err(e) => error!(error = %e, "failed to encode audit event"),
        }
    }
}

/// Body wrapper that records what streams through it
pub(crate) struct CaptureBody {
    inner: Body,
    buffer: BytesMut,
    bytes_written: u64,
    max_entity_length: usize,
    finalizer: Option<AuditFinalizer>,
}

impl CaptureBody {
    pub(crate) fn new(inner: Body, max_entity_length: usize, finalizer: AuditFinalizer) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            bytes_written: 0,
            max_entity_length,
            finalizer: Some(finalizer),
        }
    }

    /// Complete the audit exactly once
    fn finalise(&mut self) {
        if let Some(finalizer) = self.finalizer.take() {
            finalizer.finish(self.bytes_written, self.buffer.split().freeze());
        }
    }
}

impl http_body::Body for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes_written += data.len() as u64;
                    let room = this.max_entity_length.saturating_sub(this.buffer.len());
                    if room > 0 {
                        let take = room.min(data.len());
                        this.buffer.extend_from_slice(&data[..take]);
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finalise();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finalise();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        // client disconnects still produce an event for what was sent
        self.finalise();
    }
}
