//! Shared listener types
//!
//! Ingress metrics common to the UDP and TCP paths.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic ingress counters
///
/// One instance is shared by both listeners and the dispatcher, so the
/// admin surface sees a single ingress picture.
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Raw packets received off the wire
    pub packets_received: AtomicU64,

    /// Raw bytes received
    pub bytes_received: AtomicU64,

    /// Packets that failed to decode and were dropped
    pub decode_errors: AtomicU64,

    /// Decoded packets the writer refused (backpressure or closed)
    pub packets_dropped: AtomicU64,

    /// Socket-level errors (recv failures, accept failures)
    pub socket_errors: AtomicU64,

    /// Currently open TCP connections
    pub connections_active: AtomicU64,

    /// TCP connections accepted over the process lifetime
    pub connections_total: AtomicU64,
}

impl ListenerMetrics {
    pub const fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            socket_errors: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn packet_received(&self, bytes: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn packet_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn socket_error(&self) {
        self.socket_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot
    pub fn snapshot(&self) -> ListenerSnapshot {
        ListenerSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            socket_errors: self.socket_errors.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ListenerMetrics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerSnapshot {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub decode_errors: u64,
    pub packets_dropped: u64,
    pub socket_errors: u64,
    pub connections_active: u64,
    pub connections_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_tracking() {
        let metrics = ListenerMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();

        let snap = metrics.snapshot();
        assert_eq!(snap.connections_active, 1);
        assert_eq!(snap.connections_total, 2);
    }

    #[test]
    fn packet_tracking() {
        let metrics = ListenerMetrics::new();
        metrics.packet_received(100);
        metrics.packet_received(250);
        metrics.decode_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.packets_received, 2);
        assert_eq!(snap.bytes_received, 350);
        assert_eq!(snap.decode_errors, 1);
    }
}
