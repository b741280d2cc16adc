use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::{frame_packet, FrameDecision, FrameError, HepTcpListener, TcpListenerConfig};
use crate::common::ListenerMetrics;
use crate::dispatch::Dispatcher;
use crate::testutil::{sample_wire_packet, wait_until, CaptureWriter};

// =============================================================================
// Framing
// =============================================================================

#[test]
fn empty_buffer_needs_more() {
    assert_eq!(frame_packet(&[], 65535), Ok(FrameDecision::NeedMore));
}

#[test]
fn v1_buffer_is_one_packet_per_read() {
    let buf = [1u8; 40];
    assert_eq!(frame_packet(&buf, 65535), Ok(FrameDecision::Packet(40)));
}

#[test]
fn v3_frames_by_advertised_length() {
    let wire = sample_wire_packet(1);
    assert_eq!(
        frame_packet(&wire, 65535),
        Ok(FrameDecision::Packet(wire.len()))
    );

    // Two packets coalesced into one read still frame one at a time.
    let mut doubled = wire.clone();
    doubled.extend_from_slice(&wire);
    assert_eq!(
        frame_packet(&doubled, 65535),
        Ok(FrameDecision::Packet(wire.len()))
    );
}

#[test]
fn partial_v3_accumulates() {
    let wire = sample_wire_packet(1);
    assert_eq!(frame_packet(&wire[..3], 65535), Ok(FrameDecision::NeedMore));
    assert_eq!(frame_packet(&wire[..5], 65535), Ok(FrameDecision::NeedMore));
    assert_eq!(
        frame_packet(&wire[..wire.len() - 1], 65535),
        Ok(FrameDecision::NeedMore)
    );
}

#[test]
fn v3_length_below_header_is_fatal() {
    let mut buf = b"HEP3".to_vec();
    buf.extend_from_slice(&2u16.to_be_bytes());
    assert_eq!(frame_packet(&buf, 65535), Err(FrameError::BadLength(2)));
}

#[test]
fn v3_length_above_limit_is_fatal() {
    let mut buf = b"HEP3".to_vec();
    buf.extend_from_slice(&40_000u16.to_be_bytes());
    assert_eq!(
        frame_packet(&buf, 1024),
        Err(FrameError::Oversized {
            size: 40_000,
            limit: 1024
        })
    );
}

#[test]
fn h_prefix_without_magic_is_a_plain_packet() {
    let buf = b"HELO something else entirely";
    assert_eq!(
        frame_packet(buf, 65535),
        Ok(FrameDecision::Packet(buf.len()))
    );
    // Too short to rule the magic out yet.
    assert_eq!(frame_packet(b"HE", 65535), Ok(FrameDecision::NeedMore));
}

// =============================================================================
// Connection handling
// =============================================================================

struct TcpHarness {
    writer: Arc<CaptureWriter>,
    metrics: Arc<ListenerMetrics>,
    addr: std::net::SocketAddr,
    cancel: CancellationToken,
}

async fn start_listener() -> TcpHarness {
    let writer = Arc::new(CaptureWriter::default());
    let metrics = Arc::new(ListenerMetrics::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&writer) as _,
        Arc::clone(&metrics),
    ));

    let config = TcpListenerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        max_packet_size: 65535,
    };
    let listener = HepTcpListener::bind(config, dispatcher).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let cancel = CancellationToken::new();
    tokio::spawn(listener.run(cancel.clone()));

    TcpHarness {
        writer,
        metrics,
        addr,
        cancel,
    }
}

#[tokio::test]
async fn streams_v3_packets_with_partial_reads() {
    let harness = start_listener().await;
    let mut stream = tokio::net::TcpStream::connect(harness.addr).await.unwrap();

    // First packet split mid-frame; the handler must accumulate.
    let wire = sample_wire_packet(11);
    let (head, tail) = wire.split_at(wire.len() / 2);
    stream.write_all(head).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(tail).await.unwrap();

    // Second packet in one piece.
    stream.write_all(&sample_wire_packet(12)).await.unwrap();

    wait_until("both stream packets dispatched", || {
        harness.writer.count() == 2
    })
    .await;

    let node_ids: Vec<u32> = harness
        .writer
        .packets
        .lock()
        .iter()
        .map(|p| p.node_id)
        .collect();
    assert_eq!(node_ids, vec![11, 12]);

    harness.cancel.cancel();
}

#[tokio::test]
async fn truncated_stream_is_counted_at_eof() {
    let harness = start_listener().await;
    let mut stream = tokio::net::TcpStream::connect(harness.addr).await.unwrap();

    let wire = sample_wire_packet(13);
    stream.write_all(&wire[..8]).await.unwrap();
    drop(stream); // EOF with a partial frame buffered

    wait_until("truncated frame counted", || {
        harness.metrics.snapshot().decode_errors == 1
    })
    .await;
    assert_eq!(harness.writer.count(), 0);

    harness.cancel.cancel();
}

#[tokio::test]
async fn connection_error_does_not_stop_the_accept_loop() {
    let harness = start_listener().await;

    // A desynchronised v3 stream terminates its own connection.
    let mut bad = tokio::net::TcpStream::connect(harness.addr).await.unwrap();
    let mut frame = b"HEP3".to_vec();
    frame.extend_from_slice(&1u16.to_be_bytes());
    bad.write_all(&frame).await.unwrap();

    // A healthy connection still works afterwards.
    let mut good = tokio::net::TcpStream::connect(harness.addr).await.unwrap();
    good.write_all(&sample_wire_packet(14)).await.unwrap();

    wait_until("healthy connection dispatched", || {
        harness.writer.count() == 1
    })
    .await;
    assert_eq!(harness.writer.packets.lock()[0].node_id, 14);

    harness.cancel.cancel();
}
