//! Common types shared by all writers
//!
//! Errors, the atomic stats core, and its observable snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

/// Errors produced by writers and the batch engine
#[derive(Debug, Error)]
pub enum WriterError {
    /// Writer could not be constructed (bad connection settings, missing
    /// directory, unreadable metadata)
    #[error("failed to initialize writer: {0}")]
    Init(String),

    /// A flush to the backend failed; the batch was dropped
    #[error("flush failed: {0}")]
    Flush(String),

    /// The buffer hit its hard cap; the packet was rejected
    #[error("writer buffer full")]
    Backpressure,

    /// Submit after close
    #[error("writer is closed")]
    Closed,

    /// The writer cannot serve this search (e.g. full-text predicates on a
    /// backend without an index)
    #[error("search not supported by this writer")]
    Unsupported,

    /// Search parameters outside what the writer accepts
    #[error("invalid search parameters: {0}")]
    InvalidParams(String),

    /// I/O error from a file-backed writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a flush error
    pub fn flush(msg: impl Into<String>) -> Self {
        Self::Flush(msg.into())
    }
}

/// Atomic counters plus the most recent error and write time
///
/// Counters only ever increase. The non-counter cells sit behind one short
/// mutex; readers get a coherent snapshot, writers hold the lock only for
/// the assignment.
#[derive(Debug, Default)]
pub struct StatsCore {
    received: AtomicU64,
    written: AtomicU64,
    bytes_written: AtomicU64,
    errors: AtomicU64,
    last: Mutex<LastEvents>,
}

#[derive(Debug, Default, Clone)]
struct LastEvents {
    error: Option<String>,
    write_time: Option<DateTime<Utc>>,
}

impl StatsCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count packets accepted into the buffer
    #[inline]
    pub fn record_received(&self, count: u64) {
        self.received.fetch_add(count, Ordering::Relaxed);
    }

    /// Count packets persisted by a successful flush
    pub fn record_written(&self, count: u64, bytes: u64) {
        if count == 0 {
            return;
        }
        self.written.fetch_add(count, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.last.lock().write_time = Some(Utc::now());
    }

    /// Count errors and remember the most recent one
    pub fn record_error(&self, count: u64, message: impl Into<String>) {
        self.errors.fetch_add(count, Ordering::Relaxed);
        self.last.lock().error = Some(message.into());
    }

    /// Coherent point-in-time snapshot
    pub fn snapshot(&self) -> WriterStats {
        let last = self.last.lock().clone();
        WriterStats {
            received: self.received.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_error: last.error,
            last_write_time: last.write_time,
        }
    }
}

/// Point-in-time writer statistics, as served by `/api/v1/stats`
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriterStats {
    pub received: u64,
    pub written: u64,
    pub bytes_written: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_write_time: Option<DateTime<Utc>>,
}

impl WriterStats {
    /// Merge another writer's stats into this one (used by the multi
    /// writer). Counter sums stay monotone; the most recent error and
    /// write time win.
    pub fn merge(&mut self, other: &WriterStats) {
        self.received += other.received;
        self.written += other.written;
        self.bytes_written += other.bytes_written;
        self.errors += other.errors;
        if other.last_error.is_some() {
            self.last_error = other.last_error.clone();
        }
        match (self.last_write_time, other.last_write_time) {
            (Some(a), Some(b)) if b > a => self.last_write_time = Some(b),
            (None, Some(b)) => self.last_write_time = Some(b),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
