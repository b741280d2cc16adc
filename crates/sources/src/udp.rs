//! UDP listener
//!
//! HEP is UDP-first: one datagram is one packet. Multiple workers share
//! the port through SO_REUSEPORT so the kernel load-balances bursts across
//! them; each worker owns its socket and a reusable receive buffer.

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::common::ListenerMetrics;
use crate::dispatch::Dispatcher;
use crate::error::SourceError;

/// Kernel receive buffer multiplier over max_packet_size, absorbs bursts
const RECV_BUFFER_PACKETS: usize = 64;

/// UDP listener settings
#[derive(Debug, Clone)]
pub struct UdpListenerConfig {
    /// Bind address
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Number of reader workers; above 1 requires SO_REUSEPORT (unix)
    pub workers: usize,

    /// Largest datagram accepted
    pub max_packet_size: usize,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9060,
            workers: 1,
            max_packet_size: 65535,
        }
    }
}

/// Multi-worker UDP listener
pub struct UdpListener {
    config: UdpListenerConfig,
    sockets: Vec<UdpSocket>,
    dispatcher: Arc<Dispatcher>,
}

impl UdpListener {
    /// Bind one socket per worker. Bind failures are fatal and surface
    /// here, before any traffic is accepted.
    pub fn bind(
        config: UdpListenerConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, SourceError> {
        let bind_addr = format!("{}:{}", config.address, config.port);
        let addr: SocketAddr = bind_addr.parse().map_err(|_| SourceError::Bind {
            address: bind_addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let mut sockets = Vec::with_capacity(config.workers);
        for _ in 0..config.workers {
            let socket = create_reuseport_socket(addr, config.max_packet_size * RECV_BUFFER_PACKETS)
                .map_err(|e| SourceError::Bind {
                    address: bind_addr.clone(),
                    source: e,
                })?;
            sockets.push(socket);
        }

        Ok(Self {
            config,
            sockets,
            dispatcher,
        })
    }

    /// Actual bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> Result<SocketAddr, SourceError> {
        Ok(self.sockets[0].local_addr()?)
    }

    /// Run every worker until cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SourceError> {
        tracing::info!(
            address = %format!("{}:{}", self.config.address, self.config.port),
            workers = self.sockets.len(),
            "UDP listener ready"
        );

        let max_packet_size = self.config.max_packet_size;
        let mut workers = Vec::with_capacity(self.sockets.len());

        for (worker_id, socket) in self.sockets.into_iter().enumerate() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                udp_worker(worker_id, socket, max_packet_size, dispatcher, cancel).await;
            }));
        }

        for worker in workers {
            let _ = worker.await;
        }

        tracing::info!("UDP listener stopped");
        Ok(())
    }
}

/// One worker: one socket, one reusable buffer.
///
/// The dispatcher copies what it keeps, so the buffer is safe to reuse
/// for the next datagram.
async fn udp_worker(
    worker_id: usize,
    socket: UdpSocket,
    max_packet_size: usize,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    let metrics: &ListenerMetrics = dispatcher.metrics();
    let mut buf = vec![0u8; max_packet_size];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            result = socket.recv_from(&mut buf) => match result {
                Ok((len, peer)) => {
                    dispatcher.dispatch(&buf[..len], peer).await;
                }
                Err(e) => {
                    // A recv failure on UDP is transient; log and retry.
                    metrics.socket_error();
                    tracing::debug!(worker_id, error = %e, "UDP recv error");
                }
            },
        }
    }

    tracing::debug!(worker_id, "UDP worker stopped");
}

/// Socket with SO_REUSEPORT (unix) and a deep receive buffer, converted
/// for tokio.
fn create_reuseport_socket(addr: SocketAddr, recv_buffer: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    if let Err(e) = socket.set_recv_buffer_size(recv_buffer) {
        tracing::warn!(error = %e, requested = recv_buffer, "failed to set UDP SO_RCVBUF");
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
