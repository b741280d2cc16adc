//! Configuration validation
//!
//! Range and cross-field checks that YAML typing alone cannot express.
//! Runs once after parsing; a `Config` the caller holds has passed all of
//! these.

use crate::error::{ConfigError, Result};
use crate::writers::WriterKind;
use crate::Config;

pub(crate) fn validate(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_writers(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        return Err(ConfigError::invalid("server.port", "must be in 1..=65535"));
    }
    if config.server.workers == 0 {
        return Err(ConfigError::invalid("server.workers", "must be at least 1"));
    }
    if config.server.max_packet_size < 4 {
        return Err(ConfigError::invalid(
            "server.max_packet_size",
            "must hold at least a HEP header",
        ));
    }
    Ok(())
}

fn validate_writers(config: &Config) -> Result<()> {
    let writers = &config.writers;

    if writers.batch_size == 0 {
        return Err(ConfigError::invalid("writers.batch_size", "must be at least 1"));
    }
    if writers.flush_interval.is_zero() {
        return Err(ConfigError::invalid(
            "writers.flush_interval",
            "must be greater than zero",
        ));
    }
    if let Some(cap) = writers.max_buffered {
        if cap < writers.batch_size {
            return Err(ConfigError::invalid(
                "writers.max_buffered",
                "must be at least batch_size",
            ));
        }
    }

    match writers.kind {
        WriterKind::Clickhouse if writers.clickhouse.is_none() => {
            Err(ConfigError::MissingWriterConfig { kind: "clickhouse" })
        }
        WriterKind::Elastic if writers.elastic.is_none() => {
            Err(ConfigError::MissingWriterConfig { kind: "elastic" })
        }
        // Parquet has a complete default (local directory), so its section
        // may be omitted.
        WriterKind::Multi
            if writers.clickhouse.is_none()
                && writers.elastic.is_none()
                && writers.parquet.is_none() =>
        {
            Err(ConfigError::EmptyMultiWriter)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::Config;

    fn parse(yaml: &str) -> Result<Config, crate::ConfigError> {
        yaml.parse()
    }

    #[test]
    fn rejects_port_zero() {
        let err = parse("server:\n  port: 0").unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = parse("server:\n  workers: 0").unwrap_err();
        assert!(err.to_string().contains("server.workers"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = parse("writers:\n  batch_size: 0").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn rejects_zero_flush_interval() {
        let err = parse("writers:\n  flush_interval: 0s").unwrap_err();
        assert!(err.to_string().contains("flush_interval"));
    }

    #[test]
    fn rejects_max_buffered_below_batch_size() {
        let err = parse("writers:\n  batch_size: 100\n  max_buffered: 50").unwrap_err();
        assert!(err.to_string().contains("max_buffered"));
    }

    #[test]
    fn clickhouse_requires_section() {
        let err = parse("writers:\n  type: clickhouse").unwrap_err();
        assert!(err.to_string().contains("clickhouse"));
    }

    #[test]
    fn elastic_requires_section() {
        let err = parse("writers:\n  type: elastic").unwrap_err();
        assert!(err.to_string().contains("elastic"));
    }

    #[test]
    fn multi_requires_a_concrete_writer() {
        let err = parse("writers:\n  type: multi").unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn multi_with_one_writer_is_fine() {
        let yaml = r#"
writers:
  type: multi
  elastic:
    urls: ["http://localhost:9200"]
    index_name: hep
"#;
        assert!(parse(yaml).is_ok());
    }
}
