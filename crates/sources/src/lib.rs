//! hepflow - HEP ingestion
//!
//! Listeners accept raw HEP buffers from capture agents over UDP and TCP
//! and hand them to the [`Dispatcher`], which decodes and feeds the
//! configured writer. Decode failures are counted and dropped; ingestion
//! never stops because one agent sent garbage.
//!
//! ```text
//! [UdpListener workers]──┐
//!                        ├──> [Dispatcher] --decode--> [Writer::submit]
//! [HepTcpListener conns]─┘
//! ```
//!
//! Both listeners observe a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and stop accepting within the shutdown grace period.

mod common;
mod dispatch;
mod error;
mod tcp;
mod udp;

#[cfg(test)]
pub(crate) mod testutil;

pub use common::{ListenerMetrics, ListenerSnapshot};
pub use dispatch::Dispatcher;
pub use error::SourceError;
pub use tcp::{HepTcpListener, TcpListenerConfig};
pub use udp::{UdpListener, UdpListenerConfig};
