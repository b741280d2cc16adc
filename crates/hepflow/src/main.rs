//! hepflow - HEP capture aggregator
//!
//! Listens for HEP-encapsulated capture traffic on UDP/TCP, decodes it,
//! and batches it into ClickHouse, Elasticsearch, or Parquet files, with
//! an HTTP admin surface for stats and search.

mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hepflow_config::{Config, LogConfig, LogFormat};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "hepflow", version, about = "HEP capture aggregator")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration problems are fatal before any socket is bound; the
    // process exits non-zero without touching the network.
    let config = load_config(args.config)?;

    init_tracing(&config.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server.bind_address(),
        api = %config.api.bind_address(),
        "hepflow starting"
    );

    serve::run(config).await?;

    info!("hepflow shutdown complete");
    Ok(())
}

/// Load the named config, or probe the default paths, or fall back to
/// defaults when nothing is on disk.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            let candidates = [
                PathBuf::from("config/config.yaml"),
                PathBuf::from("config.yaml"),
            ];
            for candidate in &candidates {
                if candidate.exists() {
                    return Config::from_file(candidate).with_context(|| {
                        format!("failed to load configuration from {}", candidate.display())
                    });
                }
            }
            Ok(Config::default())
        }
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Console => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
