//! HEP wire-format decoder
//!
//! A pure function over a byte slice. The three versions share nothing but
//! the leading version tag, so each gets its own routine. v3 is the chunked
//! TLV format; its decoder skips unknown chunk types (the format is
//! forward-compatible) but rejects structurally broken chunks.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::DecodeError;
use crate::packet::HepPacket;
use crate::{chunk, CHUNK_HEADER_LEN, HEP3_MAGIC, HEP_V1, HEP_V2, HEP_V3};

/// Minimum v1 packet: fixed header, empty payload
const HEP_V1_MIN_LEN: usize = 22;

/// Minimum v2 packet: v1 header + family byte + proto_type byte
const HEP_V2_MIN_LEN: usize = 24;

/// Minimum v3 packet: magic + total length
const HEP_V3_MIN_LEN: usize = 6;

/// Decode a HEP buffer into a packet record.
///
/// The first byte selects the version; buffers opening with the ASCII
/// `HEP3` magic decode as v3. Anything shorter than 4 bytes is rejected
/// before dispatch.
///
/// # Errors
///
/// - [`DecodeError::PacketTooShort`] when the buffer ends before the
///   version's fixed fields
/// - [`DecodeError::InvalidVersion`] for an unknown version tag
/// - [`DecodeError::InvalidChunk`] for a structurally broken v3 body
pub fn decode(data: &[u8]) -> Result<HepPacket, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::too_short(4, data.len()));
    }

    if &data[..4] == HEP3_MAGIC {
        return decode_v3(data);
    }

    match data[0] {
        HEP_V1 => decode_v1(data),
        HEP_V2 => decode_v2(data),
        // Bare version tag without the ASCII magic; length still at bytes 4-5.
        HEP_V3 => decode_v3(data),
        other => Err(DecodeError::InvalidVersion(other)),
    }
}

/// v1: fixed header, payload is everything past byte 21.
///
/// | offset | field |
/// |---|---|
/// | 0 | version |
/// | 1 | ip protocol |
/// | 2..4 | src port |
/// | 4..6 | dst port |
/// | 6..10 | src IPv4 |
/// | 10..14 | dst IPv4 |
/// | 14..18 | timestamp (seconds) |
/// | 18..22 | node id |
fn decode_v1(data: &[u8]) -> Result<HepPacket, DecodeError> {
    if data.len() < HEP_V1_MIN_LEN {
        return Err(DecodeError::too_short(HEP_V1_MIN_LEN, data.len()));
    }

    Ok(HepPacket {
        version: HEP_V1,
        family: 2,
        protocol: data[1],
        src_port: be_u16(&data[2..4]),
        dst_port: be_u16(&data[4..6]),
        src_ip: ipv4_string(&data[6..10]),
        dst_ip: ipv4_string(&data[10..14]),
        timestamp: u64::from(be_u32(&data[14..18])),
        node_id: be_u32(&data[18..22]),
        payload: data[22..].to_vec(),
        ..Default::default()
    })
}

/// v2: as v1 shifted one byte by the family field, plus a trailing
/// proto_type byte before the payload. The family byte is recorded but only
/// IPv4 addresses are parsed.
fn decode_v2(data: &[u8]) -> Result<HepPacket, DecodeError> {
    if data.len() < HEP_V2_MIN_LEN {
        return Err(DecodeError::too_short(HEP_V2_MIN_LEN, data.len()));
    }

    Ok(HepPacket {
        version: HEP_V2,
        family: data[1],
        protocol: data[2],
        src_port: be_u16(&data[3..5]),
        dst_port: be_u16(&data[5..7]),
        src_ip: ipv4_string(&data[7..11]),
        dst_ip: ipv4_string(&data[11..15]),
        timestamp: u64::from(be_u32(&data[15..19])),
        node_id: be_u32(&data[19..23]),
        proto_type: data[23],
        payload: data[24..].to_vec(),
        ..Default::default()
    })
}

/// v3: magic at 0..4, total length at 4..6, then chunks until end of buffer.
///
/// Each chunk is `{vendor u16, type u16, length u16, value}` with `length`
/// covering the 6-byte header. Unknown types are skipped; duplicates are
/// last-writer-wins; the payload chunk is copied into the record.
fn decode_v3(data: &[u8]) -> Result<HepPacket, DecodeError> {
    if data.len() < HEP_V3_MIN_LEN {
        return Err(DecodeError::too_short(HEP_V3_MIN_LEN, data.len()));
    }

    let total = usize::from(be_u16(&data[4..6]));
    if total > data.len() {
        return Err(DecodeError::InvalidChunk("advertised length exceeds buffer"));
    }

    let mut packet = HepPacket {
        version: HEP_V3,
        family: 2,
        ..Default::default()
    };

    let mut cursor = HEP_V3_MIN_LEN;
    while cursor < data.len() {
        if cursor + CHUNK_HEADER_LEN > data.len() {
            return Err(DecodeError::InvalidChunk("truncated chunk header"));
        }

        // Vendor id at cursor..cursor+2 is ignored.
        let chunk_type = be_u16(&data[cursor + 2..cursor + 4]);
        let chunk_len = usize::from(be_u16(&data[cursor + 4..cursor + 6]));

        if chunk_len < CHUNK_HEADER_LEN {
            return Err(DecodeError::InvalidChunk("chunk length below header size"));
        }
        let end = cursor + chunk_len;
        if end > data.len() {
            return Err(DecodeError::InvalidChunk("chunk extends past buffer"));
        }

        let value = &data[cursor + CHUNK_HEADER_LEN..end];
        apply_chunk(&mut packet, chunk_type, value)?;
        cursor = end;
    }

    Ok(packet)
}

/// Map one chunk onto the packet record.
///
/// A recognised chunk whose value has the wrong width is a malformed
/// packet, not a skippable one.
fn apply_chunk(packet: &mut HepPacket, chunk_type: u16, value: &[u8]) -> Result<(), DecodeError> {
    match chunk_type {
        chunk::IP_PROTOCOL_FAMILY => {
            packet.family = exactly::<1>(value)?[0];
        }
        chunk::IP_PROTOCOL_ID => {
            packet.protocol = exactly::<1>(value)?[0];
        }
        chunk::SRC_IP => {
            packet.src_ip = ip_string(value)?;
        }
        chunk::DST_IP => {
            packet.dst_ip = ip_string(value)?;
        }
        chunk::SRC_PORT => {
            packet.src_port = be_u16(&exactly::<2>(value)?);
        }
        chunk::DST_PORT => {
            packet.dst_port = be_u16(&exactly::<2>(value)?);
        }
        chunk::TIMESTAMP => {
            packet.timestamp = u64::from_be_bytes(exactly::<8>(value)?);
        }
        chunk::PROTOCOL_TYPE => {
            packet.proto_type = exactly::<1>(value)?[0];
        }
        chunk::CAPTURE_AGENT_ID => {
            packet.node_id = be_u32(&exactly::<4>(value)?);
        }
        chunk::NODE_NAME => {
            packet.node_name = Some(String::from_utf8_lossy(value).into_owned());
        }
        chunk::PAYLOAD => {
            // Owned copy: the source buffer is reused by the listener.
            packet.payload = value.to_vec();
        }
        chunk::CORRELATION_ID => {
            packet.cid = String::from_utf8_lossy(value).into_owned();
        }
        chunk::VLAN => {
            packet.vlan = be_u16(&exactly::<2>(value)?);
        }
        // Keep-alive and auth key carry no packet data; everything else is
        // an unknown type and the format says skip, not reject.
        chunk::KEEP_ALIVE_TIMER | chunk::AUTH_KEY => {}
        _ => {}
    }
    Ok(())
}

/// Render a 4- or 16-byte address in canonical textual form.
fn ip_string(value: &[u8]) -> Result<String, DecodeError> {
    match value.len() {
        4 => Ok(ipv4_string(value)),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(value);
            Ok(Ipv6Addr::from(octets).to_string())
        }
        _ => Err(DecodeError::InvalidChunk("address is not 4 or 16 bytes")),
    }
}

fn ipv4_string(b: &[u8]) -> String {
    Ipv4Addr::new(b[0], b[1], b[2], b[3]).to_string()
}

fn exactly<const N: usize>(value: &[u8]) -> Result<[u8; N], DecodeError> {
    if value.len() != N {
        return Err(DecodeError::InvalidChunk("chunk value has wrong width"));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(value);
    Ok(out)
}

#[inline]
fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

#[inline]
fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
