//! hepflow - persistence sinks
//!
//! Every backend is a [`Writer`]: packets go in one at a time via
//! `submit`, accumulate in a shared [`BatchEngine`], and leave in batches
//! through a backend-specific [`FlushTarget`].
//!
//! ```text
//! [Listener] --HepPacket--> [Writer::submit] --> [BatchEngine buffer]
//!                                                   | size threshold
//!                                                   | flush interval
//!                                                   v
//!                                           [FlushTarget::flush]
//!                                                   v
//!                                  ClickHouse / Elasticsearch / Parquet
//! ```
//!
//! # Available writers
//!
//! | Writer | Destination | Search support |
//! |--------|-------------|----------------|
//! | `clickhouse` | ClickHouse table, one bulk INSERT per flush | time range + payload substring |
//! | `elastic` | Elasticsearch index via `_bulk` NDJSON | full query_string |
//! | `parquet` | Rotated local Parquet files keyed by source IP | time range only |
//! | `multi` | Fan-out to every configured writer | first capable child |
//!
//! # Error policy
//!
//! A failed flush drops its batch and records the error in the writer's
//! stats. HEP is a lossy capture protocol; an unbounded retry queue would
//! trade memory for data the network already agreed to lose.

pub mod batch;
pub mod clickhouse;
pub mod elastic;
pub mod multi;
pub mod parquet;
pub mod writer;

mod common;

pub use batch::{BatchConfig, BatchEngine, FlushOutcome, FlushTarget};
pub use common::{StatsCore, WriterError, WriterStats};
pub use writer::{SearchParams, SearchResult, Writer};

pub use self::clickhouse::ClickHouseWriter;
pub use self::elastic::ElasticWriter;
pub use self::multi::MultiWriter;
pub use self::parquet::ParquetWriter;
