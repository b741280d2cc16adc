//! Multi writer
//!
//! Fans every packet out to a set of child writers. Each child runs its
//! own batch engine, so batching, flush cadence, and failure isolation
//! stay per-backend; a ClickHouse outage never blocks the Parquet files.

use async_trait::async_trait;
use hepflow_protocol::HepPacket;
use std::sync::Arc;

use crate::common::{WriterError, WriterStats};
use crate::writer::{SearchParams, SearchResult, Writer};

/// Fan-out over every configured writer
pub struct MultiWriter {
    writers: Vec<Arc<dyn Writer>>,
}

impl MultiWriter {
    /// Wrap a non-empty set of writers.
    pub fn new(writers: Vec<Arc<dyn Writer>>) -> Result<Self, WriterError> {
        if writers.is_empty() {
            return Err(WriterError::init("multi writer needs at least one child"));
        }
        Ok(Self { writers })
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Always false; construction rejects the empty set.
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

#[async_trait]
impl Writer for MultiWriter {
    /// Submit to every child. A child refusing the packet (backpressure,
    /// closed) does not stop the others; the first failure is reported
    /// after all children were offered the packet.
    async fn submit(&self, packet: HepPacket) -> Result<(), WriterError> {
        let mut first_error = None;
        for writer in &self.writers {
            if let Err(e) = writer.submit(packet.clone()).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn flush(&self) -> Result<(), WriterError> {
        let mut first_error = None;
        for writer in &self.writers {
            if let Err(e) = writer.flush().await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close every child even when an earlier one fails.
    async fn close(&self) -> Result<(), WriterError> {
        let mut first_error = None;
        for writer in &self.writers {
            if let Err(e) = writer.close().await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delegate to the first child able to serve the request; a child
    /// answering `Unsupported` passes the request along.
    async fn search(&self, params: SearchParams) -> Result<SearchResult, WriterError> {
        for writer in &self.writers {
            match writer.search(params.clone()).await {
                Err(WriterError::Unsupported) => continue,
                other => return other,
            }
        }
        Err(WriterError::Unsupported)
    }

    /// Sum of the children's counters.
    fn stats(&self) -> WriterStats {
        let mut merged = WriterStats::default();
        for writer in &self.writers {
            merged.merge(&writer.stats());
        }
        merged
    }
}

#[cfg(test)]
#[path = "multi_test.rs"]
mod multi_test;
