//! TCP listener
//!
//! Capture agents that front HEP with TCP stream the same buffers the UDP
//! path sees. v3 carries its total length, so v3 streams are framed
//! precisely and partial reads accumulate until a whole packet arrived.
//! v1/v2 have no length on the wire; the framing convention is one packet
//! per read, matching the datagram shape.
//!
//! A socket error terminates its connection only; the accept loop and
//! every other connection keep going.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::SourceError;

/// Read buffer granularity per connection
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// TCP listener settings
#[derive(Debug, Clone)]
pub struct TcpListenerConfig {
    /// Bind address
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Largest packet accepted; a v3 frame advertising more than this
    /// terminates the connection as unrecoverable
    pub max_packet_size: usize,
}

impl Default for TcpListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9060,
            max_packet_size: 65535,
        }
    }
}

/// Framing decision over the head of the stream buffer
#[derive(Debug, PartialEq, Eq)]
enum FrameDecision {
    /// The next `len` bytes are one packet
    Packet(usize),
    /// Wait for more bytes
    NeedMore,
}

/// Framing failure; desynchronised streams cannot be resynchronised
#[derive(Debug, PartialEq, Eq)]
enum FrameError {
    /// v3 total length below the fixed header
    BadLength(usize),
    /// v3 total length above the packet size limit
    Oversized { size: usize, limit: usize },
}

/// TCP accept loop feeding per-connection handler tasks
pub struct HepTcpListener {
    config: TcpListenerConfig,
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl HepTcpListener {
    /// Bind the listen socket. Fatal at startup on failure.
    pub async fn bind(
        config: TcpListenerConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, SourceError> {
        let bind_addr = format!("{}:{}", config.address, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SourceError::Bind {
                address: bind_addr,
                source: e,
            })?;

        Ok(Self {
            config,
            listener,
            dispatcher,
        })
    }

    /// Actual bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> Result<SocketAddr, SourceError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until cancelled; each connection gets its own task.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SourceError> {
        tracing::info!(
            address = %format!("{}:{}", self.config.address, self.config.port),
            "TCP listener ready"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                result = self.listener.accept() => match result {
                    Ok((stream, peer)) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        let cancel = cancel.clone();
                        let max_packet_size = self.config.max_packet_size;
                        dispatcher.metrics().connection_opened();

                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, peer, max_packet_size, &dispatcher, cancel).await
                            {
                                if e.kind() != std::io::ErrorKind::UnexpectedEof {
                                    dispatcher.metrics().socket_error();
                                    tracing::debug!(peer = %peer, error = %e, "connection error");
                                }
                            }
                            dispatcher.metrics().connection_closed();
                        });
                    }
                    Err(e) => {
                        // Transient accept failure; keep accepting.
                        self.dispatcher.metrics().socket_error();
                        tracing::warn!(error = %e, "accept error");
                    }
                },
            }
        }

        tracing::info!("TCP listener stopped");
        Ok(())
    }
}

/// Read frames off one connection until EOF, error, or shutdown.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    max_packet_size: usize,
    dispatcher: &Dispatcher,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
    }

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),

            result = stream.read_buf(&mut buf) => {
                let n = result?;
                if n == 0 {
                    // EOF. A partial v3 frame left behind still goes through
                    // the dispatcher so the truncation is counted, not
                    // silently discarded.
                    if !buf.is_empty() {
                        dispatcher.dispatch(&buf, peer).await;
                    }
                    return Ok(());
                }

                loop {
                    match frame_packet(&buf, max_packet_size) {
                        Ok(FrameDecision::Packet(len)) => {
                            let frame = buf.split_to(len);
                            dispatcher.dispatch(&frame, peer).await;
                        }
                        Ok(FrameDecision::NeedMore) => break,
                        Err(e) => {
                            dispatcher.metrics().socket_error();
                            tracing::debug!(peer = %peer, error = ?e, "unrecoverable framing error, closing connection");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Decide how many leading bytes of `buf` form the next packet.
fn frame_packet(buf: &[u8], max_packet_size: usize) -> Result<FrameDecision, FrameError> {
    if buf.is_empty() {
        return Ok(FrameDecision::NeedMore);
    }

    match buf[0] {
        // ASCII magic: confirm all four bytes before treating it as v3.
        b'H' => {
            if buf.len() < 4 {
                return Ok(FrameDecision::NeedMore);
            }
            if &buf[..4] == b"HEP3" {
                v3_frame(buf, max_packet_size)
            } else {
                Ok(FrameDecision::Packet(buf.len()))
            }
        }
        // Bare v3 version tag.
        3 => v3_frame(buf, max_packet_size),
        // v1/v2 and everything else: one packet per read.
        _ => Ok(FrameDecision::Packet(buf.len())),
    }
}

/// Frame a v3 packet by its advertised total length.
fn v3_frame(buf: &[u8], max_packet_size: usize) -> Result<FrameDecision, FrameError> {
    if buf.len() < 6 {
        return Ok(FrameDecision::NeedMore);
    }

    let total = usize::from(u16::from_be_bytes([buf[4], buf[5]]));
    if total < 6 {
        return Err(FrameError::BadLength(total));
    }
    if total > max_packet_size {
        return Err(FrameError::Oversized {
            size: total,
            limit: max_packet_size,
        });
    }
    if buf.len() < total {
        return Ok(FrameDecision::NeedMore);
    }

    Ok(FrameDecision::Packet(total))
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
