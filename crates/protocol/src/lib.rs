//! HEP protocol support for hepflow
//!
//! The Homer Encapsulation Protocol (HEP) is the envelope capture agents use
//! to ship signalling traffic (SIP, RTCP, logs) to an aggregator. Three wire
//! versions are deployed:
//!
//! - **v1**: fixed 22-byte header followed by the raw payload
//! - **v2**: v1 plus an IP family byte and an application protocol tag
//! - **v3**: `HEP3` magic, a total length, and a sequence of TLV chunks
//!
//! This crate is pure: decoding and encoding operate on byte slices with no
//! I/O. The decoder always produces an owned [`HepPacket`] so the caller is
//! free to reuse its receive buffer.
//!
//! # Example
//!
//! ```
//! use hepflow_protocol::{decode, encode, HepPacket};
//!
//! let packet = HepPacket {
//!     version: 3,
//!     protocol: 17,
//!     src_ip: "192.168.1.1".into(),
//!     dst_ip: "192.168.1.2".into(),
//!     src_port: 5060,
//!     dst_port: 5060,
//!     timestamp: 1700000000,
//!     node_id: 2001,
//!     payload: b"INVITE sip:bob@example.com SIP/2.0".to_vec(),
//!     ..Default::default()
//! };
//!
//! let wire = encode(&packet).unwrap();
//! let decoded = decode(&wire).unwrap();
//! assert_eq!(decoded.src_port, 5060);
//! ```

mod decode;
mod encode;
mod error;
mod packet;

pub use decode::decode;
pub use encode::encode;
pub use error::{DecodeError, EncodeError};
pub use packet::HepPacket;

/// HEP version 1 tag (first wire byte)
pub const HEP_V1: u8 = 1;

/// HEP version 2 tag
pub const HEP_V2: u8 = 2;

/// HEP version 3 tag
pub const HEP_V3: u8 = 3;

/// v3 packets open with this ASCII magic
pub const HEP3_MAGIC: &[u8; 4] = b"HEP3";

/// v3 chunk header size (vendor + type + length)
pub const CHUNK_HEADER_LEN: usize = 6;

/// v3 chunk type identifiers
pub mod chunk {
    /// IP protocol family (2 = IPv4, 10 = IPv6)
    pub const IP_PROTOCOL_FAMILY: u16 = 0x0001;
    /// IP protocol number (17 = UDP, 6 = TCP)
    pub const IP_PROTOCOL_ID: u16 = 0x0002;
    /// Source address, 4 or 16 bytes
    pub const SRC_IP: u16 = 0x0003;
    /// Destination address, 4 or 16 bytes
    pub const DST_IP: u16 = 0x0004;
    /// Source port, big-endian u16
    pub const SRC_PORT: u16 = 0x0007;
    /// Destination port, big-endian u16
    pub const DST_PORT: u16 = 0x0008;
    /// Capture timestamp, big-endian u64 seconds
    pub const TIMESTAMP: u16 = 0x0009;
    /// Application protocol tag (1 = SIP)
    pub const PROTOCOL_TYPE: u16 = 0x000a;
    /// Capture agent node id, big-endian u32
    pub const CAPTURE_AGENT_ID: u16 = 0x000b;
    /// Keep-alive timer, ignored by the decoder
    pub const KEEP_ALIVE_TIMER: u16 = 0x000c;
    /// Authentication key, ignored by the decoder (policy hook)
    pub const AUTH_KEY: u16 = 0x000e;
    /// Captured payload bytes
    pub const PAYLOAD: u16 = 0x000f;
    /// Correlation id linking related packets
    pub const CORRELATION_ID: u16 = 0x0011;
    /// VLAN tag, big-endian u16
    pub const VLAN: u16 = 0x0012;
    /// Capture agent node name, UTF-8
    pub const NODE_NAME: u16 = 0x0013;
}
