//! hepflow configuration
//!
//! YAML-based configuration with sensible defaults: a minimal file only
//! needs the writer section it actually uses.
//!
//! # Example
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 9060
//!   protocol: both
//! writers:
//!   type: clickhouse
//!   batch_size: 1000
//!   flush_interval: 1s
//!   clickhouse:
//!     host: localhost
//!     port: 8123
//!     database: hep
//!     table: hep_packets
//! api:
//!   port: 8090
//! ```
//!
//! Parsing goes through [`Config::from_file`] or the `FromStr` impl; both
//! validate before returning, so a `Config` in hand is always usable.

mod api;
mod error;
mod logging;
mod metrics;
mod server;
mod validation;
mod writers;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use api::ApiConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::MetricsConfig;
pub use server::{ListenProtocol, ServerConfig};
pub use writers::{
    ClickHouseConfig, ElasticConfig, ParquetConfig, WriterKind, WritersConfig,
};

/// Root configuration structure
///
/// Every section is optional in the file; defaults follow the deployed
/// conventions (HEP on 9060, one worker, 1000-packet batches).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HEP listener settings
    pub server: ServerConfig,

    /// Writer selection and batching
    pub writers: WritersConfig,

    /// HTTP admin API
    pub api: ApiConfig,

    /// Prometheus metrics surface
    pub metrics: MetricsConfig,

    /// Internal logging
    pub log: LogConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        contents.parse()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(s)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
