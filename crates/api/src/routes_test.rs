use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hepflow_protocol::HepPacket;
use hepflow_sinks::{
    SearchParams, SearchResult, StatsCore, Writer, WriterError, WriterStats,
};
use hepflow_sources::ListenerMetrics;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use super::build_router;
use crate::state::{ApiOptions, AppState};

/// Writer double: canned stats, records the last search request.
struct StubWriter {
    stats: StatsCore,
    last_search: Mutex<Option<SearchParams>>,
    unsupported: bool,
}

impl StubWriter {
    fn new() -> Self {
        let stats = StatsCore::new();
        stats.record_received(5);
        stats.record_written(4, 400);
        Self {
            stats,
            last_search: Mutex::new(None),
            unsupported: false,
        }
    }

    fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl Writer for StubWriter {
    async fn submit(&self, _packet: HepPacket) -> Result<(), WriterError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), WriterError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }

    async fn search(&self, params: SearchParams) -> Result<SearchResult, WriterError> {
        if self.unsupported {
            return Err(WriterError::Unsupported);
        }
        *self.last_search.lock() = Some(params);
        Ok(SearchResult {
            total: 1,
            results: vec![HepPacket {
                version: 3,
                src_ip: "192.168.1.1".into(),
                ..Default::default()
            }],
        })
    }

    fn stats(&self) -> WriterStats {
        self.stats.snapshot()
    }
}

fn app_with(writer: Arc<StubWriter>, options: ApiOptions) -> axum::Router {
    let state = AppState::new(
        writer as _,
        Arc::new(ListenerMetrics::new()),
        options,
    );
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with(Arc::new(StubWriter::new()), ApiOptions::default());

    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn stats_returns_writer_snapshot() {
    let app = app_with(Arc::new(StubWriter::new()), ApiOptions::default());

    let response = app
        .oneshot(Request::get("/api/v1/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["received"], 5);
    assert_eq!(body["written"], 4);
    assert_eq!(body["bytes_written"], 400);
}

#[tokio::test]
async fn auth_rejects_missing_and_wrong_tokens() {
    let options = ApiOptions {
        auth_token: Some("sekrit".into()),
        ..Default::default()
    };

    let app = app_with(Arc::new(StubWriter::new()), options.clone());
    let response = app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = app_with(Arc::new(StubWriter::new()), options.clone());
    let response = app
        .oneshot(
            Request::get("/api/v1/health")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = app_with(Arc::new(StubWriter::new()), options);
    let response = app
        .oneshot(
            Request::get("/api/v1/health")
                .header(header::AUTHORIZATION, "Bearer sekrit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_get_maps_query_parameters() {
    let writer = Arc::new(StubWriter::new());
    let app = app_with(Arc::clone(&writer), ApiOptions::default());

    let uri = "/api/v1/search?q=INVITE&from=2024-01-01T00:00:00Z&limit=10&offset=5&order_by=src_port&order_desc=true";
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let params = writer.last_search.lock().clone().unwrap();
    assert_eq!(params.query, "INVITE");
    assert_eq!(params.limit, 10);
    assert_eq!(params.offset, 5);
    assert_eq!(params.order_by, "src_port");
    assert!(params.order_desc);
    assert_eq!(params.from_epoch(), 1_704_067_200);

    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["src_ip"], "192.168.1.1");
}

#[tokio::test]
async fn search_get_rejects_bad_timestamps() {
    let app = app_with(Arc::new(StubWriter::new()), ApiOptions::default());

    let response = app
        .oneshot(
            Request::get("/api/v1/search?from=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_post_accepts_json_parameters() {
    let writer = Arc::new(StubWriter::new());
    let app = app_with(Arc::clone(&writer), ApiOptions::default());

    let body = serde_json::json!({
        "query": "src_ip:10.0.0.1",
        "limit": 25,
        "order_desc": true,
    });
    let response = app
        .oneshot(
            Request::post("/api/v1/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let params = writer.last_search.lock().clone().unwrap();
    assert_eq!(params.query, "src_ip:10.0.0.1");
    assert_eq!(params.limit, 25);
}

#[tokio::test]
async fn unsupported_search_maps_to_bad_request() {
    let app = app_with(Arc::new(StubWriter::unsupported()), ApiOptions::default());

    let response = app
        .oneshot(
            Request::get("/api/v1/search?q=INVITE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let options = ApiOptions {
        metrics_enabled: true,
        metrics_path: "/metrics".into(),
        ..Default::default()
    };
    let app = app_with(Arc::new(StubWriter::new()), options);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("hepflow_writer_received_total 5"));
    assert!(text.contains("hepflow_packets_received_total 0"));
}

#[tokio::test]
async fn metrics_endpoint_absent_when_disabled() {
    let app = app_with(Arc::new(StubWriter::new()), ApiOptions::default());

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
