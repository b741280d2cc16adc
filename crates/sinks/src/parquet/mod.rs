//! Parquet writer
//!
//! Columnar files for deployments without a database: each flush writes
//! one file (one row group) per routing key, where the key is the packet's
//! source IP. File names carry a monotone id persisted in `metadata.json`,
//! so restarts continue the sequence instead of clobbering older files.
//!
//! ```text
//! {file_path}/
//! ├── metadata.json
//! ├── 192.168.1.1-000000.parquet
//! ├── 192.168.1.1-000002.parquet
//! └── 10.0.0.7-000001.parquet
//! ```
//!
//! Files are readable by DuckDB, Spark, ClickHouse, pandas and polars.

mod metadata;

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, StringArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use hepflow_protocol::HepPacket;
use parking_lot::Mutex;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::batch::{BatchConfig, BatchEngine, FlushOutcome, FlushTarget};
use crate::common::{WriterError, WriterStats};
use crate::writer::{SearchParams, SearchResult, Writer};

pub use metadata::{MetadataStore, WriterMetadata};

/// Parquet writer settings
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    /// Directory the rotated files and metadata.json live in
    pub path: PathBuf,

    /// Batching knobs
    pub batch: BatchConfig,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("hep-data"),
            batch: BatchConfig::default(),
        }
    }
}

/// Backend half: groups packets by routing key and writes one file per
/// group per flush.
struct ParquetTarget {
    base_dir: PathBuf,
    store: MetadataStore,
    metadata: Mutex<WriterMetadata>,
}

#[async_trait]
impl FlushTarget for ParquetTarget {
    async fn flush(&self, batch: Vec<HepPacket>) -> Result<FlushOutcome, WriterError> {
        let count = batch.len() as u64;

        // BTreeMap keeps file creation order deterministic across flushes.
        let mut groups: BTreeMap<String, Vec<HepPacket>> = BTreeMap::new();
        for packet in batch {
            groups.entry(routing_key(&packet.src_ip)).or_default().push(packet);
        }

        // Flushes are serial per engine, so the lock is uncontended; it
        // exists for the &self signature.
        let mut meta = self.metadata.lock();
        let mut bytes = 0u64;

        for (key, packets) in groups {
            let file_id = meta.next_id;
            meta.next_id += 1;

            let path = self.base_dir.join(format!("{key}-{file_id:06}.parquet"));
            bytes += write_packets(&path, &packets)?;
        }

        self.store.save(&meta)?;
        Ok(FlushOutcome::complete(count, bytes))
    }
}

/// Columnar-file writer producing rotated Parquet files
pub struct ParquetWriter {
    engine: Arc<BatchEngine>,
    target: Arc<ParquetTarget>,
}

impl ParquetWriter {
    /// Create the writer, loading (or initialising) its metadata.
    pub fn new(config: ParquetWriterConfig) -> Result<Self, WriterError> {
        std::fs::create_dir_all(&config.path)?;

        let store = MetadataStore::new(&config.path);
        let metadata = store.load()?;

        tracing::info!(
            path = %config.path.display(),
            writer_id = %metadata.writer_id,
            next_id = metadata.next_id,
            "parquet writer ready"
        );

        let target = Arc::new(ParquetTarget {
            base_dir: config.path,
            store,
            metadata: Mutex::new(metadata),
        });
        let engine = BatchEngine::new(config.batch, Arc::clone(&target) as _);

        Ok(Self { engine, target })
    }
}

#[async_trait]
impl Writer for ParquetWriter {
    async fn submit(&self, packet: HepPacket) -> Result<(), WriterError> {
        self.engine.submit(packet).await
    }

    async fn flush(&self) -> Result<(), WriterError> {
        self.engine.flush().await
    }

    async fn close(&self) -> Result<(), WriterError> {
        self.engine.close().await
    }

    /// Time-range scan over every rotated file. Parquet has no text index,
    /// so a non-empty query is unsupported rather than quietly ignored.
    async fn search(&self, params: SearchParams) -> Result<SearchResult, WriterError> {
        if !params.query.is_empty() {
            return Err(WriterError::Unsupported);
        }

        let from = params.from_epoch();
        let to = params.to_epoch();

        let mut matches = Vec::new();
        for path in parquet_files(&self.target.base_dir)? {
            for packet in read_packets(&path)? {
                if packet.timestamp >= from && packet.timestamp <= to {
                    matches.push(packet);
                }
            }
        }

        sort_packets(&mut matches, &params)?;

        let total = matches.len() as u64;
        let results = matches
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .collect();

        Ok(SearchResult { total, results })
    }

    fn stats(&self) -> WriterStats {
        self.engine.stats()
    }
}

/// File-name-safe routing key from a source address.
fn routing_key(src_ip: &str) -> String {
    if src_ip.is_empty() {
        return "unknown".into();
    }
    src_ip.replace(':', "_")
}

/// Arrow schema of a packets file; timestamp leads for predicate pushdown.
fn packet_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::UInt64, false),
        Field::new("version", DataType::UInt8, false),
        Field::new("family", DataType::UInt8, false),
        Field::new("protocol", DataType::UInt8, false),
        Field::new("proto_type", DataType::UInt8, false),
        Field::new("src_ip", DataType::Utf8, false),
        Field::new("dst_ip", DataType::Utf8, false),
        Field::new("src_port", DataType::UInt16, false),
        Field::new("dst_port", DataType::UInt16, false),
        Field::new("node_id", DataType::UInt32, false),
        Field::new("node_name", DataType::Utf8, true),
        Field::new("payload", DataType::Binary, false),
        Field::new("cid", DataType::Utf8, false),
        Field::new("vlan", DataType::UInt16, false),
    ]))
}

/// Write one row group of packets; returns compressed bytes written.
fn write_packets(path: &Path, packets: &[HepPacket]) -> Result<u64, WriterError> {
    let schema = packet_schema();
    let record_batch = packets_to_record_batch(packets, Arc::clone(&schema))?;

    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .map_err(|e| WriterError::flush(e.to_string()))?;
    writer
        .write(&record_batch)
        .map_err(|e| WriterError::flush(e.to_string()))?;
    writer
        .close()
        .map_err(|e| WriterError::flush(e.to_string()))?;

    Ok(std::fs::metadata(path)?.len())
}

fn packets_to_record_batch(
    packets: &[HepPacket],
    schema: Arc<Schema>,
) -> Result<RecordBatch, WriterError> {
    let timestamp = UInt64Array::from_iter_values(packets.iter().map(|p| p.timestamp));
    let version = UInt8Array::from_iter_values(packets.iter().map(|p| p.version));
    let family = UInt8Array::from_iter_values(packets.iter().map(|p| p.family));
    let protocol = UInt8Array::from_iter_values(packets.iter().map(|p| p.protocol));
    let proto_type = UInt8Array::from_iter_values(packets.iter().map(|p| p.proto_type));
    let src_ip = StringArray::from_iter_values(packets.iter().map(|p| p.src_ip.as_str()));
    let dst_ip = StringArray::from_iter_values(packets.iter().map(|p| p.dst_ip.as_str()));
    let src_port = UInt16Array::from_iter_values(packets.iter().map(|p| p.src_port));
    let dst_port = UInt16Array::from_iter_values(packets.iter().map(|p| p.dst_port));
    let node_id = UInt32Array::from_iter_values(packets.iter().map(|p| p.node_id));
    let node_name: StringArray = packets.iter().map(|p| p.node_name.as_deref()).collect();
    let payload = BinaryArray::from_iter_values(packets.iter().map(|p| p.payload.as_slice()));
    let cid = StringArray::from_iter_values(packets.iter().map(|p| p.cid.as_str()));
    let vlan = UInt16Array::from_iter_values(packets.iter().map(|p| p.vlan));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(timestamp),
        Arc::new(version),
        Arc::new(family),
        Arc::new(protocol),
        Arc::new(proto_type),
        Arc::new(src_ip),
        Arc::new(dst_ip),
        Arc::new(src_port),
        Arc::new(dst_port),
        Arc::new(node_id),
        Arc::new(node_name),
        Arc::new(payload),
        Arc::new(cid),
        Arc::new(vlan),
    ];

    RecordBatch::try_new(schema, columns).map_err(|e| WriterError::flush(e.to_string()))
}

/// Every `*.parquet` file under the base directory.
fn parquet_files(base_dir: &Path) -> Result<Vec<PathBuf>, WriterError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(base_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read every packet row out of one file.
fn read_packets(path: &Path) -> Result<Vec<HepPacket>, WriterError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| WriterError::flush(e.to_string()))?
        .build()
        .map_err(|e| WriterError::flush(e.to_string()))?;

    let mut packets = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| WriterError::flush(e.to_string()))?;
        packets.extend(record_batch_to_packets(&batch)?);
    }
    Ok(packets)
}

fn record_batch_to_packets(batch: &RecordBatch) -> Result<Vec<HepPacket>, WriterError> {
    if batch.num_columns() != 14 {
        return Err(WriterError::flush(format!(
            "packets file has {} columns, expected 14",
            batch.num_columns()
        )));
    }

    fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize) -> Result<&'a T, WriterError> {
        batch
            .column(index)
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| WriterError::flush("packets file has unexpected column layout"))
    }

    let timestamp = column::<UInt64Array>(batch, 0)?;
    let version = column::<UInt8Array>(batch, 1)?;
    let family = column::<UInt8Array>(batch, 2)?;
    let protocol = column::<UInt8Array>(batch, 3)?;
    let proto_type = column::<UInt8Array>(batch, 4)?;
    let src_ip = column::<StringArray>(batch, 5)?;
    let dst_ip = column::<StringArray>(batch, 6)?;
    let src_port = column::<UInt16Array>(batch, 7)?;
    let dst_port = column::<UInt16Array>(batch, 8)?;
    let node_id = column::<UInt32Array>(batch, 9)?;
    let node_name = column::<StringArray>(batch, 10)?;
    let payload = column::<BinaryArray>(batch, 11)?;
    let cid = column::<StringArray>(batch, 12)?;
    let vlan = column::<UInt16Array>(batch, 13)?;

    let mut packets = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        packets.push(HepPacket {
            timestamp: timestamp.value(row),
            version: version.value(row),
            family: family.value(row),
            protocol: protocol.value(row),
            proto_type: proto_type.value(row),
            src_ip: src_ip.value(row).to_string(),
            dst_ip: dst_ip.value(row).to_string(),
            src_port: src_port.value(row),
            dst_port: dst_port.value(row),
            node_id: node_id.value(row),
            node_name: node_name
                .is_valid(row)
                .then(|| node_name.value(row).to_string()),
            payload: payload.value(row).to_vec(),
            cid: cid.value(row).to_string(),
            vlan: vlan.value(row),
        });
    }
    Ok(packets)
}

/// In-memory ordering for scan results, same column set the database
/// writers accept.
fn sort_packets(packets: &mut [HepPacket], params: &SearchParams) -> Result<(), WriterError> {
    match params.order_by.as_str() {
        "timestamp" => packets.sort_by_key(|p| p.timestamp),
        "src_ip" => packets.sort_by(|a, b| a.src_ip.cmp(&b.src_ip)),
        "dst_ip" => packets.sort_by(|a, b| a.dst_ip.cmp(&b.dst_ip)),
        "src_port" => packets.sort_by_key(|p| p.src_port),
        "dst_port" => packets.sort_by_key(|p| p.dst_port),
        "node_id" => packets.sort_by_key(|p| p.node_id),
        other => {
            return Err(WriterError::InvalidParams(format!(
                "cannot order by '{other}'"
            )))
        }
    }
    if params.order_desc {
        packets.reverse();
    }
    Ok(())
}

#[cfg(test)]
#[path = "parquet_test.rs"]
mod parquet_test;
