//! Elasticsearch writer
//!
//! Batches leave as one `_bulk` request: an NDJSON body where every packet
//! document is preceded by an index-action metadata line. The bulk API can
//! partially fail, so the flush outcome credits only the documents the
//! cluster accepted and counts the rejected ones as errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hepflow_protocol::HepPacket;
use serde_json::{json, Value};

use crate::batch::{BatchConfig, BatchEngine, FlushOutcome, FlushTarget};
use crate::common::{WriterError, WriterStats};
use crate::writer::{SearchParams, SearchResult, Writer};

/// Per-request deadline for bulk and search calls
const REQUEST_DEADLINE: Duration = Duration::from_secs(60);

/// Elasticsearch writer settings
#[derive(Debug, Clone)]
pub struct ElasticWriterConfig {
    /// Cluster node URLs; the first is used for requests
    pub urls: Vec<String>,

    /// Target index
    pub index: String,

    /// Credentials, optional
    pub username: Option<String>,
    pub password: Option<String>,

    /// Batching knobs
    pub batch: BatchConfig,
}

impl Default for ElasticWriterConfig {
    fn default() -> Self {
        Self {
            urls: vec!["http://localhost:9200".into()],
            index: "hep".into(),
            username: None,
            password: None,
            batch: BatchConfig::default(),
        }
    }
}

/// Backend half: owns the HTTP client, performs bulk indexing.
struct ElasticTarget {
    http: reqwest::Client,
    base_url: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticTarget {
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut builder = self.http.request(method, url);
        if let Some(ref username) = self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        builder
    }
}

#[async_trait]
impl FlushTarget for ElasticTarget {
    async fn flush(&self, batch: Vec<HepPacket>) -> Result<FlushOutcome, WriterError> {
        let count = batch.len() as u64;
        let body = build_bulk_body(&self.index, &batch);
        let bytes = body.len() as u64;

        let response = self
            .request(reqwest::Method::POST, "_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WriterError::flush(format!(
                "bulk request returned {}",
                response.status()
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;
        let failed = count_bulk_failures(&parsed);

        Ok(FlushOutcome {
            written: count.saturating_sub(failed),
            bytes,
            failed,
        })
    }
}

/// Inverted-index writer backed by Elasticsearch
pub struct ElasticWriter {
    engine: Arc<BatchEngine>,
    target: Arc<ElasticTarget>,
}

impl ElasticWriter {
    /// Create the writer and start its flush timer.
    pub fn new(config: ElasticWriterConfig) -> Result<Self, WriterError> {
        let base_url = config
            .urls
            .first()
            .cloned()
            .ok_or_else(|| WriterError::init("elastic writer needs at least one URL"))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_DEADLINE)
            .build()
            .map_err(|e| WriterError::init(e.to_string()))?;

        let target = Arc::new(ElasticTarget {
            http,
            base_url: base_url.clone(),
            index: config.index.clone(),
            username: config.username,
            password: config.password,
        });
        let engine = BatchEngine::new(config.batch, Arc::clone(&target) as _);

        tracing::info!(
            url = %base_url,
            index = %config.index,
            "elastic writer ready"
        );

        Ok(Self { engine, target })
    }
}

#[async_trait]
impl Writer for ElasticWriter {
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
        let body = build_search_body(&params);
        let path = format!("{}/_search", self.target.index);

        let response = self
            .target
            .request(reqwest::Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WriterError::flush(format!(
                "search request returned {}",
                response.status()
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| WriterError::flush(e.to_string()))?;
        parse_search_response(&parsed)
    }

    fn stats(&self) -> WriterStats {
        self.engine.stats()
    }
}

/// NDJSON bulk body: one action line and one document line per packet,
/// newline-terminated as the bulk API requires.
fn build_bulk_body(index: &str, batch: &[HepPacket]) -> String {
    let mut body = String::with_capacity(batch.len() * 256);
    let action = format!(r#"{{"index":{{"_index":"{index}"}}}}"#);

    for packet in batch {
        body.push_str(&action);
        body.push('\n');
        // HepPacket serialisation is infallible (no maps, no non-string keys).
        if let Ok(doc) = serde_json::to_string(packet) {
            body.push_str(&doc);
        }
        body.push('\n');
    }

    body
}

/// Count per-document failures in a bulk response.
fn count_bulk_failures(response: &Value) -> u64 {
    if response["errors"].as_bool() != Some(true) {
        return 0;
    }
    response["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| {
                    item["index"]["status"]
                        .as_u64()
                        .is_none_or(|status| status >= 300)
                })
                .count() as u64
        })
        .unwrap_or(0)
}

/// Query DSL for a search request: a time-range filter, optionally a
/// query_string predicate, with sort and pagination.
fn build_search_body(params: &SearchParams) -> Value {
    let mut must = vec![json!({
        "range": {
            "timestamp": {
                "gte": params.from_epoch(),
                "lte": params.to_epoch(),
            }
        }
    })];

    if !params.query.is_empty() {
        must.push(json!({
            "query_string": { "query": params.query }
        }));
    }

    let order = if params.order_desc { "desc" } else { "asc" };

    json!({
        "query": { "bool": { "must": must } },
        "from": params.offset,
        "size": params.limit,
        "sort": [ { (params.order_by.as_str()): { "order": order } } ],
    })
}

/// Pull hits out of a search response body.
fn parse_search_response(response: &Value) -> Result<SearchResult, WriterError> {
    let total = response["hits"]["total"]["value"]
        .as_u64()
        .or_else(|| response["hits"]["total"].as_u64())
        .unwrap_or(0);

    let mut results = Vec::new();
    if let Some(hits) = response["hits"]["hits"].as_array() {
        for hit in hits {
            let packet: HepPacket = serde_json::from_value(hit["_source"].clone())
                .map_err(|e| WriterError::flush(format!("malformed search hit: {e}")))?;
            results.push(packet);
        }
    }

    Ok(SearchResult { total, results })
}
