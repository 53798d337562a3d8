//! Event encoding
//!
//! Serialises events to their JSON wire form and wraps the result in
//! [`Encoded`], the unit that flows through channels, the disk queue and
//! the delivery POST. `serde_json` emits UTF-8 without HTML escaping, so
//! `<`, `>` and `&` survive verbatim.

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

#[cfg(test)]
#[path = "encoder_test.rs"]
mod encoder_test;

/// A serialised audit event
///
/// Cheap to clone (the bytes are shared); ownership is handed through the
/// pipeline one component at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    bytes: Bytes,
}

impl Encoded {
    /// Wrap already-encoded bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A shared handle to the payload
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

impl From<Vec<u8>> for Encoded {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Encode a value to its JSON wire form
pub fn to_encoded<T: Serialize>(value: &T) -> Result<Encoded> {
    let bytes = serde_json::to_vec(value)?;
    Ok(Encoded::new(bytes))
}
