//! Packet dispatch
//!
//! The seam between the listeners and the writer: decode a raw buffer,
//! submit the packet, account for everything that goes wrong. Data-plane
//! failures end here; nothing on this path can take the process down.

use std::net::SocketAddr;
use std::sync::Arc;

use hepflow_protocol::decode;
use hepflow_sinks::{Writer, WriterError};

use crate::common::ListenerMetrics;

/// Decodes raw buffers and feeds the configured writer
pub struct Dispatcher {
    writer: Arc<dyn Writer>,
    metrics: Arc<ListenerMetrics>,
}

impl Dispatcher {
    pub fn new(writer: Arc<dyn Writer>, metrics: Arc<ListenerMetrics>) -> Self {
        Self { writer, metrics }
    }

    /// Shared ingress metrics.
    pub fn metrics(&self) -> &Arc<ListenerMetrics> {
        &self.metrics
    }

    /// Decode one buffer and submit the result.
    ///
    /// Back-pressure is the writer's call: a refused packet is counted and
    /// dropped, matching the lossy capture discipline.
    pub async fn dispatch(&self, data: &[u8], peer: SocketAddr) {
        self.metrics.packet_received(data.len() as u64);

        let packet = match decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                self.metrics.decode_error();
                tracing::debug!(peer = %peer, error = %e, len = data.len(), "dropping undecodable packet");
                return;
            }
        };

        match self.writer.submit(packet).await {
            Ok(()) => {}
            Err(WriterError::Backpressure) => {
                self.metrics.packet_dropped();
                tracing::debug!(peer = %peer, "writer buffer full, dropping packet");
            }
            Err(WriterError::Closed) => {
                self.metrics.packet_dropped();
                tracing::debug!(peer = %peer, "writer closed, dropping packet");
            }
            Err(e) => {
                self.metrics.packet_dropped();
                tracing::warn!(peer = %peer, error = %e, "writer rejected packet");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
