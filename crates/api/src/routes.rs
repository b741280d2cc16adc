//! Route table and handlers

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::{DateTime, Utc};
use hepflow_sinks::{SearchParams, SearchResult, WriterStats};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::error::ApiError;
use crate::prometheus;
use crate::state::AppState;

/// Assemble the admin router.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/search", get(search_get).post(search_post));

    if state.options.metrics_enabled {
        let path = normalize_path(&state.options.metrics_path);
        router = router.route(&path, get(metrics));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// GET /api/v1/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "time": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/v1/stats
async fn stats(State(state): State<AppState>) -> Json<WriterStats> {
    Json(state.writer.stats())
}

/// Query-string shape of a GET search
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
    from: Option<String>,
    to: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    order_by: Option<String>,
    order_desc: Option<bool>,
}

impl SearchQuery {
    fn into_params(self) -> Result<SearchParams, ApiError> {
        let mut params = SearchParams::default();
        if let Some(q) = self.q {
            params.query = q;
        }
        params.from_time = parse_time("from", self.from)?;
        params.to_time = parse_time("to", self.to)?;
        if let Some(limit) = self.limit {
            params.limit = limit;
        }
        if let Some(offset) = self.offset {
            params.offset = offset;
        }
        if let Some(order_by) = self.order_by {
            params.order_by = order_by;
        }
        if let Some(order_desc) = self.order_desc {
            params.order_desc = order_desc;
        }
        Ok(params)
    }
}

fn parse_time(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("'{field}' is not an RFC3339 timestamp"))),
    }
}

/// GET /api/v1/search
async fn search_get(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResult>, ApiError> {
    let params = query.into_params()?;
    Ok(Json(state.writer.search(params).await?))
}

/// POST /api/v1/search
async fn search_post(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> Result<Json<SearchResult>, ApiError> {
    Ok(Json(state.writer.search(params).await?))
}

/// GET <metrics.path>
async fn metrics(State(state): State<AppState>) -> String {
    prometheus::render(
        &state.listener_metrics.snapshot(),
        &state.writer.stats(),
    )
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;
