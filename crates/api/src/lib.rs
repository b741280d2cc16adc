//! hepflow admin API
//!
//! Read-only HTTP surface for operators, built on Axum:
//!
//! - `GET /api/v1/health` - liveness
//! - `GET /api/v1/stats` - writer statistics snapshot
//! - `GET|POST /api/v1/search` - search persisted packets
//! - `GET <metrics.path>` - Prometheus text metrics (when enabled)
//!
//! When an auth token is configured, every request must carry
//! `Authorization: Bearer <token>`.
//!
//! # Usage
//!
//! ```ignore
//! let state = AppState::new(writer, listener_metrics, ApiOptions::default());
//! let app = build_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8090").await?;
//! axum::serve(listener, app).await?;
//! ```

mod auth;
mod error;
mod prometheus;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::{ApiOptions, AppState};
