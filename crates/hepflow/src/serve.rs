//! Server wiring and lifecycle
//!
//! Builds the configured writer, starts the listeners and the admin API,
//! then waits for SIGINT/SIGTERM. Shutdown propagates through one
//! cancellation token: listeners stop accepting, drain, and the writer
//! takes a final flush before the process exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hepflow_api::{ApiOptions, AppState};
use hepflow_config::{Config, WriterKind};
use hepflow_sinks::{
    BatchConfig, ClickHouseWriter, ElasticWriter, MultiWriter, ParquetWriter, Writer,
};
use hepflow_sinks::clickhouse::ClickHouseWriterConfig;
use hepflow_sinks::elastic::ElasticWriterConfig;
use hepflow_sinks::parquet::ParquetWriterConfig;
use hepflow_sources::{
    Dispatcher, HepTcpListener, ListenerMetrics, TcpListenerConfig, UdpListener,
    UdpListenerConfig,
};

/// How long each component gets to wind down after the shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the aggregator until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    // Writer first: a bad backend configuration must fail before any
    // capture agent can connect.
    let writer = build_writer(&config).context("failed to initialize writer")?;

    let listener_metrics = Arc::new(ListenerMetrics::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&writer),
        Arc::clone(&listener_metrics),
    ));

    // Listeners; bind failures are fatal at startup.
    let mut listener_tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    if config.server.protocol.wants_udp() {
        let udp = UdpListener::bind(
            UdpListenerConfig {
                address: config.server.host.clone(),
                port: config.server.port,
                workers: config.server.workers,
                max_packet_size: config.server.max_packet_size,
            },
            Arc::clone(&dispatcher),
        )
        .context("failed to bind UDP listener")?;

        let cancel = cancel.clone();
        listener_tasks.push((
            "udp",
            tokio::spawn(async move {
                if let Err(e) = udp.run(cancel).await {
                    error!(error = %e, "UDP listener error");
                }
            }),
        ));
    }

    if config.server.protocol.wants_tcp() {
        let tcp = HepTcpListener::bind(
            TcpListenerConfig {
                address: config.server.host.clone(),
                port: config.server.port,
                max_packet_size: config.server.max_packet_size,
            },
            Arc::clone(&dispatcher),
        )
        .await
        .context("failed to bind TCP listener")?;

        let cancel = cancel.clone();
        listener_tasks.push((
            "tcp",
            tokio::spawn(async move {
                if let Err(e) = tcp.run(cancel).await {
                    error!(error = %e, "TCP listener error");
                }
            }),
        ));
    }

    // Admin API.
    if config.api.enable_pprof {
        warn!("api.enable_pprof is set but profiling endpoints are not supported; ignoring");
    }
    let api_task = start_api(&config, Arc::clone(&writer), listener_metrics, cancel.clone())
        .await
        .context("failed to start admin API")?;

    info!(
        listeners = listener_tasks.len(),
        writer = ?config.writers.kind,
        "hepflow server running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping");

    cancel.cancel();

    for (name, task) in listener_tasks {
        match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(listener = name, error = %e, "listener task panicked"),
            Err(_) => warn!(listener = name, "listener did not stop within grace period"),
        }
    }

    // Final flush; in-flight batches are best-effort by design.
    if let Err(e) = writer.close().await {
        warn!(error = %e, "final flush failed");
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, api_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "API server task panicked"),
        Err(_) => warn!("API server did not stop within grace period"),
    }

    Ok(())
}

/// Construct the writer stack named by the configuration.
fn build_writer(config: &Config) -> Result<Arc<dyn Writer>> {
    let writers = &config.writers;
    let batch = BatchConfig {
        batch_size: writers.batch_size,
        flush_interval: writers.flush_interval,
        max_buffered: writers.max_buffered,
    };

    // Validation already required the section matching the kind; the
    // context strings cover direct construction of an unvalidated Config.
    let writer: Arc<dyn Writer> = match writers.kind {
        WriterKind::Clickhouse => {
            let ch = writers
                .clickhouse
                .as_ref()
                .context("clickhouse writer selected but not configured")?;
            Arc::new(ClickHouseWriter::new(clickhouse_config(ch, &batch)))
        }
        WriterKind::Elastic => {
            let es = writers
                .elastic
                .as_ref()
                .context("elastic writer selected but not configured")?;
            Arc::new(ElasticWriter::new(elastic_config(es, &batch))?)
        }
        WriterKind::Parquet => {
            let pq = writers.parquet.clone().unwrap_or_default();
            Arc::new(ParquetWriter::new(parquet_config(&pq, &batch))?)
        }
        WriterKind::Multi => {
            let mut children: Vec<Arc<dyn Writer>> = Vec::new();
            if let Some(ref ch) = writers.clickhouse {
                children.push(Arc::new(ClickHouseWriter::new(clickhouse_config(ch, &batch))));
            }
            if let Some(ref es) = writers.elastic {
                children.push(Arc::new(ElasticWriter::new(elastic_config(es, &batch))?));
            }
            if let Some(ref pq) = writers.parquet {
                children.push(Arc::new(ParquetWriter::new(parquet_config(pq, &batch))?));
            }
            Arc::new(MultiWriter::new(children)?)
        }
    };

    Ok(writer)
}

fn clickhouse_config(
    ch: &hepflow_config::ClickHouseConfig,
    batch: &BatchConfig,
) -> ClickHouseWriterConfig {
    ClickHouseWriterConfig {
        url: ch.url(),
        database: ch.database.clone(),
        table: ch.table.clone(),
        username: ch.username.clone(),
        password: ch.password.clone(),
        batch: batch.clone(),
    }
}

fn elastic_config(
    es: &hepflow_config::ElasticConfig,
    batch: &BatchConfig,
) -> ElasticWriterConfig {
    ElasticWriterConfig {
        urls: es.urls.clone(),
        index: es.index_name.clone(),
        username: es.username.clone(),
        password: es.password.clone(),
        batch: batch.clone(),
    }
}

fn parquet_config(
    pq: &hepflow_config::ParquetConfig,
    batch: &BatchConfig,
) -> ParquetWriterConfig {
    ParquetWriterConfig {
        path: pq.file_path.clone().into(),
        batch: batch.clone(),
    }
}

/// Bind and spawn the admin API server with graceful shutdown.
async fn start_api(
    config: &Config,
    writer: Arc<dyn Writer>,
    listener_metrics: Arc<ListenerMetrics>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let options = ApiOptions {
        auth_token: config.api.auth_token.clone(),
        metrics_enabled: config.metrics.enable,
        metrics_path: config.metrics.path.clone(),
    };
    let state = AppState::new(writer, listener_metrics, options);
    let app = hepflow_api::build_router(state);

    let addr = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind API server to {addr}"))?;

    info!(addr = %addr, metrics = config.metrics.enable, "admin API listening");

    Ok(tokio::spawn(async move {
        let shutdown = async move { cancel.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!(error = %e, "API server error");
        }
    }))
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
