//! HEP wire-format encoder
//!
//! Builds v1/v2/v3 buffers from a packet record. Used by the round-trip
//! tests and by tooling that replays captured traffic at an aggregator.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::EncodeError;
use crate::packet::HepPacket;
use crate::{chunk, HEP3_MAGIC, HEP_V1, HEP_V2, HEP_V3};

/// Encode a packet to the wire format named by `packet.version`.
pub fn encode(packet: &HepPacket) -> Result<Vec<u8>, EncodeError> {
    match packet.version {
        HEP_V1 => encode_v1(packet),
        HEP_V2 => encode_v2(packet),
        HEP_V3 => Ok(encode_v3(packet)),
        other => Err(EncodeError::UnsupportedVersion(other)),
    }
}

fn encode_v1(packet: &HepPacket) -> Result<Vec<u8>, EncodeError> {
    let src = ipv4_octets("src_ip", &packet.src_ip, HEP_V1)?;
    let dst = ipv4_octets("dst_ip", &packet.dst_ip, HEP_V1)?;

    let mut out = Vec::with_capacity(22 + packet.payload.len());
    out.push(HEP_V1);
    out.push(packet.protocol);
    out.extend_from_slice(&packet.src_port.to_be_bytes());
    out.extend_from_slice(&packet.dst_port.to_be_bytes());
    out.extend_from_slice(&src);
    out.extend_from_slice(&dst);
    out.extend_from_slice(&(packet.timestamp as u32).to_be_bytes());
    out.extend_from_slice(&packet.node_id.to_be_bytes());
    out.extend_from_slice(&packet.payload);
    Ok(out)
}

fn encode_v2(packet: &HepPacket) -> Result<Vec<u8>, EncodeError> {
    let src = ipv4_octets("src_ip", &packet.src_ip, HEP_V2)?;
    let dst = ipv4_octets("dst_ip", &packet.dst_ip, HEP_V2)?;

    let mut out = Vec::with_capacity(24 + packet.payload.len());
    out.push(HEP_V2);
    out.push(packet.family);
    out.push(packet.protocol);
    out.extend_from_slice(&packet.src_port.to_be_bytes());
    out.extend_from_slice(&packet.dst_port.to_be_bytes());
    out.extend_from_slice(&src);
    out.extend_from_slice(&dst);
    out.extend_from_slice(&(packet.timestamp as u32).to_be_bytes());
    out.extend_from_slice(&packet.node_id.to_be_bytes());
    out.push(packet.proto_type);
    out.extend_from_slice(&packet.payload);
    Ok(out)
}

/// v3 chunks are emitted in canonical field order. Optional fields
/// (node name, correlation id, vlan) are only emitted when set, so a
/// decode of the result compares equal to the input.
fn encode_v3(packet: &HepPacket) -> Vec<u8> {
    let mut body = Vec::with_capacity(128 + packet.payload.len());

    push_chunk(&mut body, chunk::IP_PROTOCOL_FAMILY, &[family_of(packet)]);
    push_chunk(&mut body, chunk::IP_PROTOCOL_ID, &[packet.protocol]);
    if let Some(octets) = ip_octets(&packet.src_ip) {
        push_chunk(&mut body, chunk::SRC_IP, &octets);
    }
    if let Some(octets) = ip_octets(&packet.dst_ip) {
        push_chunk(&mut body, chunk::DST_IP, &octets);
    }
    push_chunk(&mut body, chunk::SRC_PORT, &packet.src_port.to_be_bytes());
    push_chunk(&mut body, chunk::DST_PORT, &packet.dst_port.to_be_bytes());
    push_chunk(&mut body, chunk::TIMESTAMP, &packet.timestamp.to_be_bytes());
    push_chunk(&mut body, chunk::PROTOCOL_TYPE, &[packet.proto_type]);
    push_chunk(&mut body, chunk::CAPTURE_AGENT_ID, &packet.node_id.to_be_bytes());
    if let Some(ref name) = packet.node_name {
        push_chunk(&mut body, chunk::NODE_NAME, name.as_bytes());
    }
    push_chunk(&mut body, chunk::PAYLOAD, &packet.payload);
    if !packet.cid.is_empty() {
        push_chunk(&mut body, chunk::CORRELATION_ID, packet.cid.as_bytes());
    }
    if packet.vlan != 0 {
        push_chunk(&mut body, chunk::VLAN, &packet.vlan.to_be_bytes());
    }

    let total = 6 + body.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(HEP3_MAGIC);
    out.extend_from_slice(&(total as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

fn push_chunk(out: &mut Vec<u8>, chunk_type: u16, value: &[u8]) {
    out.extend_from_slice(&0u16.to_be_bytes()); // vendor id
    out.extend_from_slice(&chunk_type.to_be_bytes());
    out.extend_from_slice(&((6 + value.len()) as u16).to_be_bytes());
    out.extend_from_slice(value);
}

/// Family byte for a v3 packet; inferred from the source address when the
/// record carries none.
fn family_of(packet: &HepPacket) -> u8 {
    if packet.family != 0 {
        return packet.family;
    }
    match packet.src_ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => 10,
        _ => 2,
    }
}

fn ip_octets(addr: &str) -> Option<Vec<u8>> {
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Some(v4.octets().to_vec()),
        Ok(IpAddr::V6(v6)) => Some(v6.octets().to_vec()),
        Err(_) => None,
    }
}

fn ipv4_octets(field: &'static str, addr: &str, version: u8) -> Result<[u8; 4], EncodeError> {
    match addr.parse::<Ipv4Addr>() {
        Ok(v4) => Ok(v4.octets()),
        Err(_) => {
            if addr.parse::<IpAddr>().is_ok() {
                Err(EncodeError::AddressNotV4 {
                    field,
                    value: addr.to_string(),
                    version,
                })
            } else {
                Err(EncodeError::InvalidAddress {
                    field,
                    value: addr.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
