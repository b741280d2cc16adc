//! Listener error types

use thiserror::Error;

/// Errors raised by the UDP/TCP listeners
#[derive(Debug, Error)]
pub enum SourceError {
    /// Could not bind the listen socket; fatal at startup
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside the per-connection recovery paths
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
