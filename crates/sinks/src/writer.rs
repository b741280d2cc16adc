//! The writer seam
//!
//! Every persistence backend implements [`Writer`]. The server only ever
//! holds an `Arc<dyn Writer>`, so backends can be swapped (or fanned out
//! via [`crate::MultiWriter`]) without touching the ingest path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hepflow_protocol::HepPacket;
use serde::{Deserialize, Serialize};

use crate::common::{WriterError, WriterStats};

/// A pluggable persistence backend
#[async_trait]
pub trait Writer: Send + Sync {
    /// Accept one packet into the writer's buffer.
    ///
    /// The fast path appends and returns; persistence happens on batch
    /// boundaries. Fails with [`WriterError::Backpressure`] when the buffer
    /// cap is hit and [`WriterError::Closed`] after `close`.
    async fn submit(&self, packet: HepPacket) -> Result<(), WriterError>;

    /// Persist whatever is buffered, regardless of thresholds.
    async fn flush(&self) -> Result<(), WriterError>;

    /// Final flush and resource teardown. Idempotent.
    async fn close(&self) -> Result<(), WriterError>;

    /// Search persisted packets.
    ///
    /// Backends without full-text support return
    /// [`WriterError::Unsupported`] for a non-empty `query`.
    async fn search(&self, params: SearchParams) -> Result<SearchResult, WriterError>;

    /// Current statistics snapshot.
    fn stats(&self) -> WriterStats;
}

/// Search request parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Full-text / substring predicate; empty means unfiltered
    pub query: String,

    /// Inclusive lower bound on the capture timestamp
    pub from_time: Option<DateTime<Utc>>,

    /// Inclusive upper bound on the capture timestamp
    pub to_time: Option<DateTime<Utc>>,

    /// Maximum results returned
    pub limit: usize,

    /// Results skipped before the first returned
    pub offset: usize,

    /// Sort column
    pub order_by: String,

    /// Sort descending
    pub order_desc: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            from_time: None,
            to_time: None,
            limit: 100,
            offset: 0,
            order_by: "timestamp".into(),
            order_desc: false,
        }
    }
}

impl SearchParams {
    /// Lower bound as epoch seconds (0 when unset)
    pub fn from_epoch(&self) -> u64 {
        self.from_time.map(|t| t.timestamp().max(0) as u64).unwrap_or(0)
    }

    /// Upper bound as epoch seconds (u64::MAX when unset)
    pub fn to_epoch(&self) -> u64 {
        self.to_time
            .map(|t| t.timestamp().max(0) as u64)
            .unwrap_or(u64::MAX)
    }
}

/// Search response
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    /// Total matching packets (may exceed `results.len()` when limited)
    pub total: u64,

    /// Matching packets, at most `limit`, after `offset`
    pub results: Vec<HepPacket>,
}
