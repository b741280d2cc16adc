//! Admin API configuration

use serde::Deserialize;

/// HTTP admin API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Accept profiling endpoints under /debug (not currently served;
    /// logged as unsupported at startup)
    pub enable_pprof: bool,

    /// Static bearer token; when set, every request must carry
    /// `Authorization: Bearer <token>`
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8090,
            enable_pprof: false,
            auth_token: None,
        }
    }
}

impl ApiConfig {
    /// Socket address string to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
