//! The canonical in-memory HEP packet record
//!
//! Every decoded packet, regardless of wire version, normalises into
//! [`HepPacket`]. Fields absent from a given version keep their defaults.

use serde::{Deserialize, Serialize};

/// A decoded HEP packet
///
/// # Invariants
///
/// - `version` is always one of 1, 2, 3
/// - `src_ip` / `dst_ip` are canonical textual form (dotted-quad for v4,
///   colon-hex for v6)
/// - `payload` is owned; it never aliases the buffer it was decoded from
///
/// Empty `payload` is legal: keep-alive packets carry none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HepPacket {
    /// Wire version this packet arrived as (1, 2 or 3)
    pub version: u8,

    /// IP protocol family (2 = IPv4, 10 = IPv6); v3 chunk 0x0001 / v2 byte 1
    pub family: u8,

    /// IP protocol number (17 = UDP, 6 = TCP)
    pub protocol: u8,

    /// Application protocol tag (1 = SIP); absent from v1
    pub proto_type: u8,

    /// Source address in textual form
    pub src_ip: String,

    /// Destination address in textual form
    pub dst_ip: String,

    /// Source port
    pub src_port: u16,

    /// Destination port
    pub dst_port: u16,

    /// Capture timestamp, seconds since epoch (v1/v2 zero-extend 32 bits)
    pub timestamp: u64,

    /// Capture agent node id
    pub node_id: u32,

    /// Capture agent node name; v3 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Captured payload, owned by this record
    #[serde(with = "payload_text")]
    pub payload: Vec<u8>,

    /// Correlation id linking related packets; v3 only
    pub cid: String,

    /// VLAN tag; v3 only
    pub vlan: u16,
}

impl HepPacket {
    /// Payload as text, replacing invalid UTF-8
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Serialise the payload as (lossy) UTF-8 text rather than a byte array.
///
/// SIP and log payloads are text in practice, and both the search API and
/// the Elasticsearch documents want them readable.
mod payload_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        Ok(s.into_bytes())
    }
}
