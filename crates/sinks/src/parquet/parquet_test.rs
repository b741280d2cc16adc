use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::batch::BatchConfig;
use crate::writer::{SearchParams, Writer};

fn packet(src_ip: &str, timestamp: u64) -> HepPacket {
    HepPacket {
        version: 3,
        family: 2,
        protocol: 17,
        proto_type: 1,
        src_ip: src_ip.into(),
        dst_ip: "10.0.0.2".into(),
        src_port: 5060,
        dst_port: 5060,
        timestamp,
        node_id: 2001,
        node_name: Some("edge-01".into()),
        payload: b"BYE sip:bob@example.com SIP/2.0".to_vec(),
        cid: "call-9".into(),
        vlan: 0,
    }
}

fn config(dir: &std::path::Path) -> ParquetWriterConfig {
    ParquetWriterConfig {
        path: dir.to_path_buf(),
        batch: BatchConfig {
            batch_size: 1000,
            flush_interval: Duration::from_secs(3600),
            max_buffered: None,
        },
    }
}

#[test]
fn routing_keys_are_filename_safe() {
    assert_eq!(routing_key("192.168.1.1"), "192.168.1.1");
    assert_eq!(routing_key("2001:db8::1"), "2001_db8__1");
    assert_eq!(routing_key(""), "unknown");
}

#[test]
fn record_batch_roundtrip_preserves_packets() {
    let packets = vec![packet("10.0.0.1", 100), packet("10.0.0.2", 200)];
    let batch = packets_to_record_batch(&packets, packet_schema()).unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 14);

    let back = record_batch_to_packets(&batch).unwrap();
    assert_eq!(back, packets);
}

#[test]
fn record_batch_keeps_null_node_name() {
    let mut p = packet("10.0.0.1", 100);
    p.node_name = None;
    let batch = packets_to_record_batch(std::slice::from_ref(&p), packet_schema()).unwrap();
    let back = record_batch_to_packets(&batch).unwrap();
    assert_eq!(back[0].node_name, None);
}

#[tokio::test]
async fn flush_writes_one_file_per_routing_key() {
    let dir = tempdir().unwrap();
    let writer = ParquetWriter::new(config(dir.path())).unwrap();

    writer.submit(packet("192.168.1.1", 100)).await.unwrap();
    writer.submit(packet("192.168.1.1", 101)).await.unwrap();
    writer.submit(packet("10.0.0.7", 102)).await.unwrap();
    writer.close().await.unwrap();

    let files = parquet_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![
        "10.0.0.7-000000.parquet",
        "192.168.1.1-000001.parquet",
    ]);

    let stats = writer.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.written, 3);
    assert!(stats.bytes_written > 0);
}

#[tokio::test]
async fn next_id_persists_across_writers() {
    let dir = tempdir().unwrap();

    let writer = ParquetWriter::new(config(dir.path())).unwrap();
    writer.submit(packet("10.0.0.1", 100)).await.unwrap();
    writer.close().await.unwrap();

    let store = MetadataStore::new(dir.path());
    assert_eq!(store.load().unwrap().next_id, 1);

    // A second writer continues the sequence rather than reusing ids.
    let writer = ParquetWriter::new(config(dir.path())).unwrap();
    writer.submit(packet("10.0.0.1", 200)).await.unwrap();
    writer.close().await.unwrap();

    assert_eq!(store.load().unwrap().next_id, 2);
    let files = parquet_files(dir.path()).unwrap();
    assert_eq!(files.len(), 2);
}

#[tokio::test]
async fn search_scans_time_range_across_files() {
    let dir = tempdir().unwrap();
    let writer = ParquetWriter::new(config(dir.path())).unwrap();

    for ts in [100u64, 200, 300, 400] {
        writer.submit(packet("10.0.0.1", ts)).await.unwrap();
    }
    writer.flush().await.unwrap();

    let result = writer
        .search(SearchParams {
            from_time: Some(chrono::DateTime::from_timestamp(150, 0).unwrap()),
            to_time: Some(chrono::DateTime::from_timestamp(350, 0).unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.total, 2);
    let timestamps: Vec<u64> = result.results.iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![200, 300]);

    writer.close().await.unwrap();
}

#[tokio::test]
async fn search_orders_and_paginates() {
    let dir = tempdir().unwrap();
    let writer = ParquetWriter::new(config(dir.path())).unwrap();

    for ts in [300u64, 100, 200] {
        writer.submit(packet("10.0.0.1", ts)).await.unwrap();
    }
    writer.flush().await.unwrap();

    let result = writer
        .search(SearchParams {
            order_desc: true,
            limit: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(result.total, 3);
    let timestamps: Vec<u64> = result.results.iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![300, 200]);

    let result = writer
        .search(SearchParams {
            offset: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(result.total, 3);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].timestamp, 300);

    writer.close().await.unwrap();
}

#[tokio::test]
async fn search_rejects_full_text_queries() {
    let dir = tempdir().unwrap();
    let writer = ParquetWriter::new(config(dir.path())).unwrap();

    let result = writer
        .search(SearchParams {
            query: "INVITE".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(result, Err(WriterError::Unsupported)));

    writer.close().await.unwrap();
}
