//! Prometheus metrics surface configuration

use serde::Deserialize;

/// Metrics exposition settings
///
/// When enabled, the admin server mounts a Prometheus text endpoint at
/// `path`. `host`/`port` are accepted for deployments that front the
/// endpoint separately; the built-in server serves it on the API port.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve the metrics endpoint
    pub enable: bool,

    /// Advertised host
    pub host: String,

    /// Advertised port
    pub port: u16,

    /// Endpoint path
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            host: "0.0.0.0".into(),
            port: 8090,
            path: "/metrics".into(),
        }
    }
}
