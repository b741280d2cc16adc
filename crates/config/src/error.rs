//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
///
/// All of these are fatal at startup: a process with a broken configuration
/// must not begin accepting traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field holds a value outside its allowed range
    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    /// The selected writer type has no matching sub-config section
    #[error("writer type '{kind}' requires a '{kind}' section")]
    MissingWriterConfig { kind: &'static str },

    /// `type: multi` with nothing to fan out to
    #[error("writer type 'multi' requires at least one of clickhouse, elastic, parquet")]
    EmptyMultiWriter,
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
