//! Codec error types

use thiserror::Error;

/// Errors produced while decoding a HEP buffer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ends before the fields the version requires
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    /// First byte is not a known HEP version tag
    #[error("invalid HEP version {0}")]
    InvalidVersion(u8),

    /// A v3 chunk is malformed or inconsistent with the buffer
    #[error("invalid chunk: {0}")]
    InvalidChunk(&'static str),
}

impl DecodeError {
    #[inline]
    pub(crate) fn too_short(expected: usize, actual: usize) -> Self {
        Self::PacketTooShort { expected, actual }
    }
}

/// Errors produced while encoding a packet to the wire
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Packet carries a version outside 1..=3
    #[error("cannot encode HEP version {0}")]
    UnsupportedVersion(u8),

    /// An address field does not parse as an IP address
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    /// v1/v2 headers only carry IPv4 addresses
    #[error("{field} '{value}' is not IPv4, required by HEP v{version}")]
    AddressNotV4 {
        field: &'static str,
        value: String,
        version: u8,
    },
}
