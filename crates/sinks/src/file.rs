//! File sink
//!
//! Appends each encoded event to a local file as one JSON line. Useful for
//! air-gapped environments and for diffing audit output in tests; the
//! write is flushed per event so a tail of the file is always current.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tapwire_events::Encoded;

use crate::error::{Result, SinkError};
use crate::AuditSink;

/// Sink that appends events to a file, one JSON line each
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    events_written: AtomicU64,
}

impl FileSink {
    /// Open (or create) the destination file in append mode
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SinkError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            events_written: AtomicU64::new(0),
        })
    }

    /// Events written so far
    pub fn events_written(&self) -> u64 {
        self.events_written.load(Ordering::Relaxed)
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl AuditSink for FileSink {
    fn audit(&self, encoded: Encoded) -> Result<()> {
        let mut writer = self.writer.lock();
        let write = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
            writer.write_all(encoded.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()
        };
        write(&mut writer).map_err(|e| self.io_error(e))?;
        self.events_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush().map_err(|e| self.io_error(e))?;
        writer
            .get_ref()
            .sync_data()
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let sink = FileSink::create(&path).unwrap();

        sink.audit(Encoded::new(&br#"{"a":1}"#[..])).unwrap();
        sink.audit(Encoded::new(&br#"{"b":2}"#[..])).unwrap();
        sink.close().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(sink.events_written(), 2);
    }

    #[tokio::test]
    async fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");

        let sink = FileSink::create(&path).unwrap();
        sink.audit(Encoded::new(&b"one"[..])).unwrap();
        sink.close().await.unwrap();

        let sink = FileSink::create(&path).unwrap();
        sink.audit(Encoded::new(&b"two"[..])).unwrap();
        sink.close().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }
}
