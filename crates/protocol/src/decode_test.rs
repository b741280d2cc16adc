use crate::{chunk, decode, DecodeError, HepPacket, HEP3_MAGIC};

/// Build a v3 buffer from (chunk_type, value) pairs with a correctly
/// stamped total length.
fn v3_buffer(chunks: &[(u16, &[u8])]) -> Vec<u8> {
    let total: usize = 6 + chunks.iter().map(|(_, v)| 6 + v.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(HEP3_MAGIC);
    out.extend_from_slice(&(total as u16).to_be_bytes());
    for (chunk_type, value) in chunks {
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&chunk_type.to_be_bytes());
        out.extend_from_slice(&((6 + value.len()) as u16).to_be_bytes());
        out.extend_from_slice(value);
    }
    out
}

fn standard_v3_chunks() -> Vec<(u16, Vec<u8>)> {
    vec![
        (chunk::IP_PROTOCOL_FAMILY, vec![0x02]),
        (chunk::IP_PROTOCOL_ID, vec![17]),
        (chunk::SRC_IP, vec![192, 168, 1, 1]),
        (chunk::DST_IP, vec![192, 168, 1, 2]),
        (chunk::SRC_PORT, vec![0x13, 0xc4]),
        (chunk::DST_PORT, vec![0x13, 0xc4]),
        (chunk::TIMESTAMP, 1_700_000_000u64.to_be_bytes().to_vec()),
        (chunk::PROTOCOL_TYPE, vec![0x01]),
        (chunk::CAPTURE_AGENT_ID, vec![0x00, 0x00, 0x07, 0xd1]),
        (chunk::PAYLOAD, b"TEST".to_vec()),
    ]
}

#[test]
fn decodes_v1() {
    let mut packet = vec![0u8; 30];
    packet[0] = 1;
    packet[1] = 17;
    packet[2..4].copy_from_slice(&5060u16.to_be_bytes());
    packet[4..6].copy_from_slice(&5060u16.to_be_bytes());
    packet[6..10].copy_from_slice(&[192, 168, 1, 1]);
    packet[10..14].copy_from_slice(&[192, 168, 1, 2]);
    packet[14..18].copy_from_slice(&1_700_000_000u32.to_be_bytes());
    packet[18..22].copy_from_slice(&2001u32.to_be_bytes());
    packet[22..26].copy_from_slice(b"TEST");

    let hep = decode(&packet).unwrap();
    assert_eq!(hep.version, 1);
    assert_eq!(hep.protocol, 17);
    assert_eq!(hep.src_port, 5060);
    assert_eq!(hep.dst_port, 5060);
    assert_eq!(hep.src_ip, "192.168.1.1");
    assert_eq!(hep.dst_ip, "192.168.1.2");
    assert_eq!(hep.timestamp, 1_700_000_000);
    assert_eq!(hep.node_id, 2001);
    assert_eq!(&hep.payload[..4], b"TEST");
}

#[test]
fn decodes_v1_with_empty_payload() {
    let mut packet = vec![0u8; 22];
    packet[0] = 1;
    packet[1] = 6;
    let hep = decode(&packet).unwrap();
    assert_eq!(hep.version, 1);
    assert_eq!(hep.protocol, 6);
    assert!(hep.payload.is_empty());
}

#[test]
fn decodes_v2() {
    let mut packet = vec![0u8; 35];
    packet[0] = 2;
    packet[1] = 2; // AF_INET
    packet[2] = 17;
    packet[3..5].copy_from_slice(&5060u16.to_be_bytes());
    packet[5..7].copy_from_slice(&5060u16.to_be_bytes());
    packet[7..11].copy_from_slice(&[192, 168, 1, 1]);
    packet[11..15].copy_from_slice(&[192, 168, 1, 2]);
    packet[15..19].copy_from_slice(&1_700_000_000u32.to_be_bytes());
    packet[19..23].copy_from_slice(&2001u32.to_be_bytes());
    packet[23] = 1; // SIP
    packet[24..28].copy_from_slice(b"TEST");

    let hep = decode(&packet).unwrap();
    assert_eq!(hep.version, 2);
    assert_eq!(hep.family, 2);
    assert_eq!(hep.protocol, 17);
    assert_eq!(hep.proto_type, 1);
    assert_eq!(hep.src_port, 5060);
    assert_eq!(hep.src_ip, "192.168.1.1");
    assert_eq!(hep.dst_ip, "192.168.1.2");
    assert_eq!(hep.node_id, 2001);
    assert_eq!(&hep.payload[..4], b"TEST");
}

#[test]
fn decodes_v3_multi_chunk() {
    let chunks = standard_v3_chunks();
    let refs: Vec<(u16, &[u8])> = chunks.iter().map(|(t, v)| (*t, v.as_slice())).collect();
    let hep = decode(&v3_buffer(&refs)).unwrap();

    assert_eq!(hep.version, 3);
    assert_eq!(hep.family, 2);
    assert_eq!(hep.protocol, 17);
    assert_eq!(hep.proto_type, 1);
    assert_eq!(hep.src_ip, "192.168.1.1");
    assert_eq!(hep.dst_ip, "192.168.1.2");
    assert_eq!(hep.src_port, 5060);
    assert_eq!(hep.dst_port, 5060);
    assert_eq!(hep.timestamp, 1_700_000_000);
    assert_eq!(hep.node_id, 2001);
    assert_eq!(hep.payload, b"TEST");
}

#[test]
fn v3_unknown_chunk_is_skipped() {
    let mut chunks = standard_v3_chunks();
    chunks.insert(3, (0x9999, vec![0xde, 0xad, 0xbe, 0xef]));
    let refs: Vec<(u16, &[u8])> = chunks.iter().map(|(t, v)| (*t, v.as_slice())).collect();

    let hep = decode(&v3_buffer(&refs)).unwrap();

    // Recognised fields are untouched by the unknown chunk.
    assert_eq!(hep.src_ip, "192.168.1.1");
    assert_eq!(hep.dst_ip, "192.168.1.2");
    assert_eq!(hep.src_port, 5060);
    assert_eq!(hep.node_id, 2001);
    assert_eq!(hep.payload, b"TEST");
}

#[test]
fn v3_accepts_bare_version_tag() {
    // Some agents send 0x03 plus zero padding instead of the ASCII magic.
    let refs: Vec<(u16, &[u8])> = vec![(chunk::SRC_PORT, &[0x13, 0xc4])];
    let mut buf = v3_buffer(&refs);
    buf[0] = 3;
    buf[1] = 0;
    buf[2] = 0;
    buf[3] = 0;

    let hep = decode(&buf).unwrap();
    assert_eq!(hep.version, 3);
    assert_eq!(hep.src_port, 5060);
}

#[test]
fn v3_duplicate_chunk_last_writer_wins() {
    let refs: Vec<(u16, &[u8])> = vec![
        (chunk::SRC_PORT, &[0x13, 0xc4]),
        (chunk::SRC_PORT, &[0x00, 0x50]),
    ];
    let hep = decode(&v3_buffer(&refs)).unwrap();
    assert_eq!(hep.src_port, 80);
}

#[test]
fn v3_renders_ipv6_addresses() {
    let src: [u8; 16] = [
        0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01,
    ];
    let refs: Vec<(u16, &[u8])> = vec![
        (chunk::IP_PROTOCOL_FAMILY, &[10]),
        (chunk::SRC_IP, &src),
    ];
    let hep = decode(&v3_buffer(&refs)).unwrap();
    assert_eq!(hep.family, 10);
    assert_eq!(hep.src_ip, "2001:db8::1");
}

#[test]
fn v3_decodes_node_name_and_cid_and_vlan() {
    let refs: Vec<(u16, &[u8])> = vec![
        (chunk::NODE_NAME, b"edge-capture-01"),
        (chunk::CORRELATION_ID, b"call-abc123"),
        (chunk::VLAN, &[0x00, 0x64]),
    ];
    let hep = decode(&v3_buffer(&refs)).unwrap();
    assert_eq!(hep.node_name.as_deref(), Some("edge-capture-01"));
    assert_eq!(hep.cid, "call-abc123");
    assert_eq!(hep.vlan, 100);
}

#[test]
fn v3_keepalive_and_auth_chunks_are_ignored() {
    let refs: Vec<(u16, &[u8])> = vec![
        (chunk::KEEP_ALIVE_TIMER, &[0x00, 0x1e]),
        (chunk::AUTH_KEY, b"secret"),
    ];
    let hep = decode(&v3_buffer(&refs)).unwrap();
    assert_eq!(hep.version, 3);
    assert!(hep.payload.is_empty());
}

#[test]
fn v3_payload_is_owned_copy() {
    let refs: Vec<(u16, &[u8])> = vec![(chunk::PAYLOAD, b"OPTIONS sip:ping")];
    let mut buf = v3_buffer(&refs);
    let hep = decode(&buf).unwrap();

    // Clobber the source buffer; the packet must be unaffected.
    buf.iter_mut().for_each(|b| *b = 0);
    assert_eq!(hep.payload, b"OPTIONS sip:ping");
}

#[test]
fn rejects_buffers_under_four_bytes() {
    for buf in [&[][..], &[0x01][..], &[0x01, 0x02, 0x03][..]] {
        match decode(buf) {
            Err(DecodeError::PacketTooShort { .. }) => {}
            other => panic!("expected PacketTooShort, got {other:?}"),
        }
    }
}

#[test]
fn rejects_unknown_version_tags() {
    for version in [0u8, 4, 5, 0x7f, 0xff] {
        let buf = [version, 0, 0, 0];
        assert_eq!(decode(&buf), Err(DecodeError::InvalidVersion(version)));
    }
}

#[test]
fn rejects_short_v1_and_v2() {
    let v1 = [1u8, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        decode(&v1),
        Err(DecodeError::PacketTooShort { expected: 22, .. })
    ));

    let v2 = [2u8; 20];
    assert!(matches!(
        decode(&v2),
        Err(DecodeError::PacketTooShort { expected: 24, .. })
    ));
}

#[test]
fn rejects_v3_total_length_past_buffer() {
    let refs: Vec<(u16, &[u8])> = vec![(chunk::PAYLOAD, b"TEST")];
    let mut buf = v3_buffer(&refs);
    let advertised = (buf.len() + 10) as u16;
    buf[4..6].copy_from_slice(&advertised.to_be_bytes());

    assert_eq!(
        decode(&buf),
        Err(DecodeError::InvalidChunk("advertised length exceeds buffer"))
    );
}

#[test]
fn rejects_v3_chunk_length_below_header() {
    let mut buf = Vec::new();
    buf.extend_from_slice(HEP3_MAGIC);
    buf.extend_from_slice(&12u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&chunk::PAYLOAD.to_be_bytes());
    buf.extend_from_slice(&5u16.to_be_bytes()); // below the 6-byte header

    assert_eq!(
        decode(&buf),
        Err(DecodeError::InvalidChunk("chunk length below header size"))
    );
}

#[test]
fn rejects_v3_chunk_past_buffer_end() {
    let mut buf = Vec::new();
    buf.extend_from_slice(HEP3_MAGIC);
    buf.extend_from_slice(&14u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&chunk::PAYLOAD.to_be_bytes());
    buf.extend_from_slice(&20u16.to_be_bytes()); // claims more than remains
    buf.extend_from_slice(b"AB");

    assert_eq!(
        decode(&buf),
        Err(DecodeError::InvalidChunk("chunk extends past buffer"))
    );
}

#[test]
fn rejects_v3_recognised_chunk_with_wrong_width() {
    let refs: Vec<(u16, &[u8])> = vec![(chunk::SRC_PORT, &[0x13])];
    assert_eq!(
        decode(&v3_buffer(&refs)),
        Err(DecodeError::InvalidChunk("chunk value has wrong width"))
    );

    let refs: Vec<(u16, &[u8])> = vec![(chunk::SRC_IP, &[1, 2, 3])];
    assert_eq!(
        decode(&v3_buffer(&refs)),
        Err(DecodeError::InvalidChunk("address is not 4 or 16 bytes"))
    );
}

#[test]
fn v3_without_payload_chunk_yields_empty_payload() {
    let refs: Vec<(u16, &[u8])> = vec![(chunk::CAPTURE_AGENT_ID, &[0, 0, 0, 9])];
    let hep = decode(&v3_buffer(&refs)).unwrap();
    assert_eq!(hep.node_id, 9);
    assert!(hep.payload.is_empty());
    assert_eq!(hep, HepPacket {
        version: 3,
        family: 2,
        node_id: 9,
        ..Default::default()
    });
}
