//! ClickHouse writer
//!
//! One bulk `INSERT` per flush into a single packets table, over the HTTP
//! interface via the `clickhouse` crate. A lost connection fails the flush
//! and the engine drops the batch; the next batch starts fresh.

use std::sync::Arc;

use async_trait::async_trait;
use clickhouse::{Client, Row};
use hepflow_protocol::HepPacket;
use serde::{Deserialize, Serialize};

use crate::batch::{BatchConfig, BatchEngine, FlushOutcome, FlushTarget};
use crate::common::{WriterError, WriterStats};
use crate::writer::{SearchParams, SearchResult, Writer};

/// Per-request deadline for inserts and queries
const REQUEST_DEADLINE_SECS: u64 = 60;

/// Columns `order_by` may name; anything else is rejected rather than
/// interpolated into SQL.
const ORDER_COLUMNS: &[&str] = &[
    "timestamp",
    "src_ip",
    "dst_ip",
    "src_port",
    "dst_port",
    "node_id",
];

/// ClickHouse writer settings
#[derive(Debug, Clone)]
pub struct ClickHouseWriterConfig {
    /// HTTP endpoint, e.g. "http://localhost:8123"
    pub url: String,

    /// Target database
    pub database: String,

    /// Target table
    pub table: String,

    /// Credentials, optional
    pub username: Option<String>,
    pub password: Option<String>,

    /// Batching knobs
    pub batch: BatchConfig,
}

impl Default for ClickHouseWriterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            table: "hep_packets".into(),
            username: None,
            password: None,
            batch: BatchConfig::default(),
        }
    }
}

impl ClickHouseWriterConfig {
    fn build_client(&self) -> Client {
        let mut client = Client::default()
            .with_url(&self.url)
            .with_database(&self.database)
            .with_option("max_execution_time", REQUEST_DEADLINE_SECS.to_string());

        if let Some(ref username) = self.username {
            client = client.with_user(username);
        }
        if let Some(ref password) = self.password {
            client = client.with_password(password);
        }

        client
    }
}

/// One row of the packets table
#[derive(Debug, Row, Serialize, Deserialize)]
struct PacketRow {
    version: u8,
    protocol_family: u8,
    protocol: u8,
    proto_type: u8,
    src_ip: String,
    dst_ip: String,
    src_port: u16,
    dst_port: u16,
    timestamp: u64,
    node_id: u32,
    node_name: String,
    payload: String,
    cid: String,
    vlan: u16,
}

impl From<HepPacket> for PacketRow {
    fn from(p: HepPacket) -> Self {
        Self {
            version: p.version,
            protocol_family: p.family,
            protocol: p.protocol,
            proto_type: p.proto_type,
            src_ip: p.src_ip,
            dst_ip: p.dst_ip,
            src_port: p.src_port,
            dst_port: p.dst_port,
            timestamp: p.timestamp,
            node_id: p.node_id,
            node_name: p.node_name.unwrap_or_default(),
            payload: String::from_utf8_lossy(&p.payload).into_owned(),
            cid: p.cid,
            vlan: p.vlan,
        }
    }
}

impl From<PacketRow> for HepPacket {
    fn from(r: PacketRow) -> Self {
        Self {
            version: r.version,
            family: r.protocol_family,
            protocol: r.protocol,
            proto_type: r.proto_type,
            src_ip: r.src_ip,
            dst_ip: r.dst_ip,
            src_port: r.src_port,
            dst_port: r.dst_port,
            timestamp: r.timestamp,
            node_id: r.node_id,
            node_name: (!r.node_name.is_empty()).then_some(r.node_name),
            payload: r.payload.into_bytes(),
            cid: r.cid,
            vlan: r.vlan,
        }
    }
}

/// Backend half: owns the client, performs the bulk insert.
struct ClickHouseTarget {
    client: Client,
    table: String,
}

#[async_trait]
impl FlushTarget for ClickHouseTarget {
    async fn flush(&self, batch: Vec<HepPacket>) -> Result<FlushOutcome, WriterError> {
        let count = batch.len() as u64;
        let mut bytes = 0u64;

        let mut insert = self
            .client
            .insert(&self.table)
            .map_err(|e| WriterError::flush(e.to_string()))?;

        for packet in batch {
            bytes += packet.payload.len() as u64;
            let row = PacketRow::from(packet);
            insert
                .write(&row)
                .await
                .map_err(|e| WriterError::flush(e.to_string()))?;
        }

        insert
            .end()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;

        Ok(FlushOutcome::complete(count, bytes))
    }
}

/// Columnar-store writer backed by ClickHouse
pub struct ClickHouseWriter {
    engine: Arc<BatchEngine>,
    target: Arc<ClickHouseTarget>,
}

impl ClickHouseWriter {
    /// Create the writer and start its flush timer.
    pub fn new(config: ClickHouseWriterConfig) -> Self {
        let target = Arc::new(ClickHouseTarget {
            client: config.build_client(),
            table: config.table.clone(),
        });
        let engine = BatchEngine::new(config.batch.clone(), Arc::clone(&target) as _);

        tracing::info!(
            url = %config.url,
            database = %config.database,
            table = %config.table,
            batch_size = config.batch.batch_size,
            "clickhouse writer ready"
        );

        Self { engine, target }
    }
}

#[async_trait]
impl Writer for ClickHouseWriter {
    async fn submit(&self, packet: HepPacket) -> Result<(), WriterError> {
        self.engine.submit(packet).await
    }

    async fn flush(&self) -> Result<(), WriterError> {
        self.engine.flush().await
    }

    async fn close(&self) -> Result<(), WriterError> {
        self.engine.close().await
    }

    async fn search(&self, params: SearchParams) -> Result<SearchResult, WriterError> {
        let sql = build_search_sql(&self.target.table, &params)?;

        let mut query = self
            .target
            .client
            .query(&sql)
            .bind(params.from_epoch())
            .bind(params.to_epoch());
        if !params.query.is_empty() {
            query = query.bind(params.query.as_str());
        }

        let rows: Vec<PacketRow> = query
            .fetch_all()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;

        Ok(SearchResult {
            total: rows.len() as u64,
            results: rows.into_iter().map(HepPacket::from).collect(),
        })
    }

    fn stats(&self) -> WriterStats {
        self.engine.stats()
    }
}

/// Assemble the search statement. Only the validated order column and the
/// literal limit/offset are interpolated; user text goes through binds.
fn build_search_sql(table: &str, params: &SearchParams) -> Result<String, WriterError> {
    let order_col = if ORDER_COLUMNS.contains(&params.order_by.as_str()) {
        params.order_by.as_str()
    } else {
        return Err(WriterError::InvalidParams(format!(
            "order_by must be one of {:?}",
            ORDER_COLUMNS
        )));
    };
    let direction = if params.order_desc { "DESC" } else { "ASC" };

    let mut sql = format!(
        "SELECT version, protocol_family, protocol, proto_type, src_ip, dst_ip, \
         src_port, dst_port, timestamp, node_id, node_name, payload, cid, vlan \
         FROM {table} WHERE timestamp >= ? AND timestamp <= ?"
    );
    if !params.query.is_empty() {
        sql.push_str(" AND positionCaseInsensitive(payload, ?) > 0");
    }
    sql.push_str(&format!(
        " ORDER BY {order_col} {direction} LIMIT {} OFFSET {}",
        params.limit, params.offset
    ));

    Ok(sql)
}
