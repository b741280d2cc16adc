//! Writer selection and per-backend connection settings

use std::time::Duration;

use serde::Deserialize;

/// Default packets per batch before a flush
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default age-based flush interval
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Which persistence backend(s) to run
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    /// ClickHouse bulk inserts
    Clickhouse,
    /// Elasticsearch bulk indexing
    Elastic,
    /// Local Parquet files (default: works with zero external services)
    #[default]
    Parquet,
    /// Every configured backend at once
    Multi,
}

/// Writer section of the configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WritersConfig {
    /// Backend selection
    #[serde(rename = "type")]
    pub kind: WriterKind,

    /// Packets buffered before a size-triggered flush
    pub batch_size: usize,

    /// Upper bound on how long a packet waits in the buffer
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Optional hard cap on buffered packets; submits beyond it are
    /// rejected rather than growing the buffer without bound
    pub max_buffered: Option<usize>,

    /// ClickHouse connection, required when `type` is clickhouse
    pub clickhouse: Option<ClickHouseConfig>,

    /// Elasticsearch connection, required when `type` is elastic
    pub elastic: Option<ElasticConfig>,

    /// Parquet output; when `type` is parquet and this is absent, the
    /// defaults (local `hep-data` directory) apply
    pub parquet: Option<ParquetConfig>,
}

impl Default for WritersConfig {
    fn default() -> Self {
        Self {
            kind: WriterKind::Parquet,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_buffered: None,
            clickhouse: None,
            elastic: None,
            parquet: None,
        }
    }
}

/// ClickHouse connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClickHouseConfig {
    /// Server host (HTTP interface)
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// Target database
    pub database: String,

    /// Target table
    pub table: String,

    /// Credentials, optional
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8123,
            database: "default".into(),
            table: "hep_packets".into(),
            username: None,
            password: None,
        }
    }
}

impl ClickHouseConfig {
    /// HTTP URL for the clickhouse client
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Elasticsearch connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticConfig {
    /// Cluster node URLs; the first is used for bulk and search requests
    pub urls: Vec<String>,

    /// Target index
    pub index_name: String,

    /// Credentials, optional
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            urls: vec!["http://localhost:9200".into()],
            index_name: "hep".into(),
            username: None,
            password: None,
        }
    }
}

/// Parquet output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParquetConfig {
    /// Directory the rotated files and metadata.json live in
    pub file_path: String,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            file_path: "hep-data".into(),
        }
    }
}
