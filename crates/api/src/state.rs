//! Shared state for API handlers

use std::sync::Arc;

use hepflow_sinks::Writer;
use hepflow_sources::ListenerMetrics;

/// Behavioural options for the router
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Static bearer token; `None` disables authentication
    pub auth_token: Option<String>,

    /// Serve the Prometheus endpoint
    pub metrics_enabled: bool,

    /// Path of the Prometheus endpoint
    pub metrics_path: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            auth_token: None,
            metrics_enabled: false,
            metrics_path: "/metrics".into(),
        }
    }
}

/// State injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// The writer the server persists into; search and stats go here
    pub writer: Arc<dyn Writer>,

    /// Ingress counters shared with the listeners
    pub listener_metrics: Arc<ListenerMetrics>,

    /// Router options
    pub options: Arc<ApiOptions>,
}

impl AppState {
    pub fn new(
        writer: Arc<dyn Writer>,
        listener_metrics: Arc<ListenerMetrics>,
        options: ApiOptions,
    ) -> Self {
        Self {
            writer,
            listener_metrics,
            options: Arc::new(options),
        }
    }
}
