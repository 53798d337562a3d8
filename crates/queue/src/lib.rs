//! Disk-backed persistent FIFO
//!
//! A crash-safe queue of opaque byte payloads, stored as a directory of
//! append-only segment files. Producers enqueue encoded audit events here
//! so they survive process restarts; delivery workers drain the queue at
//! their own pace.
//!
//! # On-disk layout
//!
//! ```text
//! {dir}/
//! ├── HEAD                    # "head_segment head_offset"
//! ├── 00000000000000000000.seg
//! └── 00000000000000000001.seg
//! ```
//!
//! Each segment is a sequence of `[4-byte BE length][payload]` records.
//! New records append to the highest-numbered segment; a segment past its
//! capacity is closed and a new one started. Reads proceed from the `HEAD`
//! position; a fully consumed non-tail segment is deleted.
//!
//! # Durability
//!
//! - Enqueue flushes the record before returning: after `enqueue` returns,
//!   the entry survives a process crash (torn writes from a crash mid-append
//!   are detected by length and truncated away on reopen).
//! - The `HEAD` position is rewritten on every dequeue without fsync.
//!   After a crash, recently dequeued entries may be delivered again -
//!   the queue is at-least-once, never lossy.
//!
//! # Example
//!
//! ```ignore
//! let queue = DiskQueue::open("/var/lib/tapwire/queue")?;
//! queue.enqueue(b"payload")?;
//! while let Some(item) = queue.dequeue()? {
//!     deliver(item)?;
//! }
//! queue.close()?;
//! ```

mod error;

pub use error::{QueueError, Result};

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;


/// Size of the per-record length field
const LENGTH_FIELD_SIZE: u64 = 4;

/// Default segment capacity before rotation (4 MiB)
const DEFAULT_SEGMENT_CAPACITY: u64 = 4 * 1024 * 1024;

/// Name of the read-position file
const HEAD_FILE: &str = "HEAD";

/// Segment file extension
const SEGMENT_EXTENSION: &str = "seg";

/// A persistent FIFO of byte payloads
///
/// Safe to share between threads; every operation takes a short internal
/// lock. Ordering is strict FIFO across the whole queue.
#[derive(Debug)]
pub struct DiskQueue {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    /// Sorted indices of live segments; never empty
    segments: Vec<u64>,
    head_segment: u64,
    head_offset: u64,
    /// Append handle for the tail segment
    writer: BufWriter<File>,
    /// Bytes written to the tail segment so far
    tail_size: u64,
    /// Records between head and tail
    pending: u64,
    segment_capacity: u64,
    closed: bool,
}

impl DiskQueue {
    /// Open (or create) a queue in the given directory
    ///
    /// Recovers any entries left by a previous process: the tail segment is
    /// scanned for a torn final record and truncated to the last complete
    /// record boundary.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_capacity(dir, DEFAULT_SEGMENT_CAPACITY)
    }

    /// Open with a custom segment capacity
    ///
    /// Smaller segments rotate (and reclaim disk) sooner; the capacity does
    /// not bound individual record size.
    pub fn open_with_capacity(dir: impl Into<PathBuf>, segment_capacity: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| QueueError::io(&dir, e))?;

        let mut segments = scan_segments(&dir)?;
        if segments.is_empty() {
            segments.push(0);
        }
        let tail = *segments.last().unwrap_or(&0);

        let tail_size = recover_tail(&dir, tail)?;

        let (mut head_segment, mut head_offset) = read_head(&dir);
        if !segments.contains(&head_segment) {
            head_segment = segments[0];
            head_offset = 0;
        }
        if head_segment == tail && head_offset > tail_size {
            // HEAD ran ahead of a truncated tail: those records were consumed
            head_offset = tail_size;
        }

        let writer = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(segment_path(&dir, tail))
                .map_err(|e| QueueError::io(&dir, e))?,
        );

        let mut inner = Inner {
            dir,
            segments,
            head_segment,
            head_offset,
            writer,
            tail_size,
            pending: 0,
            segment_capacity,
            closed: false,
        };
        inner.pending = inner.count_pending()?;

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Append a payload to the tail of the queue
    ///
    /// The record is flushed before this returns.
    pub fn enqueue(&self, payload: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }

        if inner.tail_size >= inner.segment_capacity {
            inner.rotate()?;
        }

        let len = u32::try_from(payload.len()).map_err(|_| QueueError::PayloadTooLarge {
            length: payload.len(),
        })?;

        let dir = inner.dir.clone();
        let write = |inner: &mut Inner| -> std::io::Result<()> {
            inner.writer.write_all(&len.to_be_bytes())?;
            inner.writer.write_all(payload)?;
            inner.writer.flush()
        };
        write(&mut inner).map_err(|e| QueueError::io(&dir, e))?;

        inner.tail_size += LENGTH_FIELD_SIZE + u64::from(len);
        inner.pending += 1;
        Ok(())
    }

    /// Remove and return the payload at the head of the queue
    ///
    /// Returns `Ok(None)` when the queue is empty; callers poll rather
    /// than block.
    pub fn dequeue(&self) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }

        loop {
            let tail = *inner.segments.last().unwrap_or(&0);
            let at_tail = inner.head_segment == tail;
            let segment_size = if at_tail {
                inner.tail_size
            } else {
                segment_size(&inner.dir, inner.head_segment)?
            };

            if inner.head_offset >= segment_size {
                if at_tail {
                    return Ok(None);
                }
                inner.advance_head_segment()?;
                continue;
            }

            let record = inner.read_record()?;
            let Some(payload) = record else {
                // torn record mid-segment: skip to the next segment
                if at_tail {
                    return Ok(None);
                }
                inner.advance_head_segment()?;
                continue;
            };

            inner.head_offset += LENGTH_FIELD_SIZE + payload.len() as u64;
            inner.pending = inner.pending.saturating_sub(1);
            inner.persist_head();
            return Ok(Some(payload));
        }
    }

    /// Number of records currently queued
    pub fn len(&self) -> u64 {
        self.inner.lock().pending
    }

    /// Whether the queue holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush pending writes and persist the read position
    ///
    /// Further operations return [`QueueError::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;

        let dir = inner.dir.clone();
        let flush = |inner: &mut Inner| -> std::io::Result<()> {
            inner.writer.flush()?;
            inner.writer.get_ref().sync_data()
        };
        flush(&mut inner).map_err(|e| QueueError::io(&dir, e))?;
        inner.persist_head();
        Ok(())
    }
}

impl Inner {
    /// Close the current tail segment and start the next one
    fn rotate(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| QueueError::io(&self.dir, e))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| QueueError::io(&self.dir, e))?;

        let next = self.segments.last().unwrap_or(&0) + 1;
        self.writer = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(segment_path(&self.dir, next))
                .map_err(|e| QueueError::io(&self.dir, e))?,
        );
        self.segments.push(next);
        self.tail_size = 0;
        Ok(())
    }

    /// Read one record at the head position, or `None` on a torn record
    fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let path = segment_path(&self.dir, self.head_segment);
        let mut file = File::open(&path).map_err(|e| QueueError::io(&path, e))?;
        file.seek(SeekFrom::Start(self.head_offset))
            .map_err(|e| QueueError::io(&path, e))?;

        let mut len_bytes = [0u8; LENGTH_FIELD_SIZE as usize];
        if file.read_exact(&mut len_bytes).is_err() {
            return Ok(None);
        }
        let len = u32::from_be_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        if file.read_exact(&mut payload).is_err() {
            return Ok(None);
        }
        Ok(Some(payload))
    }

    /// Move the head to the next segment, deleting the consumed one
    fn advance_head_segment(&mut self) -> Result<()> {
        let consumed = self.head_segment;
        let position = self
            .segments
            .iter()
            .position(|&s| s == consumed)
            .unwrap_or(0);
        let Some(&next) = self.segments.get(position + 1) else {
            return Ok(());
        };

        self.segments.remove(position);
        self.head_segment = next;
        self.head_offset = 0;
        self.persist_head();

        let path = segment_path(&self.dir, consumed);
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete consumed queue segment");
        }
        Ok(())
    }

    /// Overwrite the HEAD file with the current read position
    ///
    /// Deliberately unsynced: a crash re-delivers, never loses.
    fn persist_head(&self) {
        let path = self.dir.join(HEAD_FILE);
        let contents = format!("{} {}\n", self.head_segment, self.head_offset);
        if let Err(e) = fs::write(&path, contents) {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist queue head position");
        }
    }

    /// Count records from the head position to the tail
    fn count_pending(&self) -> Result<u64> {
        let mut count = 0u64;
        for &segment in &self.segments {
            if segment < self.head_segment {
                continue;
            }
            let path = segment_path(&self.dir, segment);
            let data = fs::read(&path).map_err(|e| QueueError::io(&path, e))?;
            let mut offset = if segment == self.head_segment {
                self.head_offset as usize
            } else {
                0
            };
            while offset + LENGTH_FIELD_SIZE as usize <= data.len() {
                let len = u32::from_be_bytes(
                    data[offset..offset + LENGTH_FIELD_SIZE as usize]
                        .try_into()
                        .unwrap(),
                ) as usize;
                let end = offset + LENGTH_FIELD_SIZE as usize + len;
                if end > data.len() {
                    break;
                }
                count += 1;
                offset = end;
            }
        }
        Ok(count)
    }
}

/// List segment indices present in the directory, sorted
fn scan_segments(dir: &Path) -> Result<Vec<u64>> {
    let mut segments = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| QueueError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| QueueError::io(dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(&format!(".{SEGMENT_EXTENSION}")) {
            if let Ok(index) = stem.parse::<u64>() {
                segments.push(index);
            }
        }
    }
    segments.sort_unstable();
    Ok(segments)
}

/// Truncate a torn trailing record left by a crash mid-append
///
/// Returns the recovered (valid) size of the tail segment.
fn recover_tail(dir: &Path, tail: u64) -> Result<u64> {
    let path = segment_path(dir, tail);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(QueueError::io(&path, e)),
    };

    let mut offset = 0usize;
    loop {
        let Some(len_bytes) = data.get(offset..offset + LENGTH_FIELD_SIZE as usize) else {
            break;
        };
        let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
        let end = offset + LENGTH_FIELD_SIZE as usize + len;
        if end > data.len() {
            break;
        }
        offset = end;
    }

    if offset < data.len() {
        tracing::warn!(
            path = %path.display(),
            valid = offset,
            total = data.len(),
            "truncating torn record at queue tail"
        );
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| QueueError::io(&path, e))?;
        file.set_len(offset as u64)
            .map_err(|e| QueueError::io(&path, e))?;
    }

    Ok(offset as u64)
}

fn segment_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{index:020}.{SEGMENT_EXTENSION}"))
}

fn segment_size(dir: &Path, index: u64) -> Result<u64> {
    let path = segment_path(dir, index);
    Ok(fs::metadata(&path)
        .map_err(|e| QueueError::io(&path, e))?
        .len())
}

fn read_head(dir: &Path) -> (u64, u64) {
    let Ok(contents) = fs::read_to_string(dir.join(HEAD_FILE)) else {
        return (0, 0);
    };
    let mut parts = contents.split_whitespace();
    let segment = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let offset = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (segment, offset)
}
