//! Generic batch accumulation engine
//!
//! Every writer shares the same buffering state machine; only the
//! [`FlushTarget`] differs. The engine owns the buffer, the flush timer
//! task, and the stats updates, so flush semantics and shutdown behave
//! identically across very different backends.
//!
//! # State machine
//!
//! Running → Flushing on a size threshold, a timer tick, or an explicit
//! `flush()`; back to Running when the target returns. `close()` moves to
//! Closed after one final flush. An async mutex serialises flushes: at most
//! one is in progress per engine, and a trigger that fires mid-flush waits
//! its turn and then drains whatever accumulated meanwhile.
//!
//! # Ordering
//!
//! The buffer swap happens under the buffer lock, and flushes are serial,
//! so the concatenation of flushed batches is exactly the submission order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hepflow_protocol::HepPacket;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{StatsCore, WriterError, WriterStats};

/// Batching knobs shared by every writer
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Flush when this many packets are buffered
    pub batch_size: usize,

    /// Flush at least this often
    pub flush_interval: Duration,

    /// Hard cap on buffered packets; `None` means unbounded
    pub max_buffered: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            flush_interval: Duration::from_secs(1),
            max_buffered: None,
        }
    }
}

/// What a flush actually persisted
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushOutcome {
    /// Packets the backend accepted
    pub written: u64,

    /// Bytes the backend accepted
    pub bytes: u64,

    /// Packets the backend rejected (bulk APIs can partially fail)
    pub failed: u64,
}

impl FlushOutcome {
    /// Every packet made it
    pub fn complete(written: u64, bytes: u64) -> Self {
        Self {
            written,
            bytes,
            failed: 0,
        }
    }
}

/// The backend half of a writer: one batch in, a result out
///
/// Implementations own their connection or file handles exclusively; the
/// engine guarantees `flush` is never called concurrently with itself.
#[async_trait]
pub trait FlushTarget: Send + Sync {
    /// Persist one batch. The batch is consumed either way; on error it is
    /// dropped by the engine per the capture discipline.
    async fn flush(&self, batch: Vec<HepPacket>) -> Result<FlushOutcome, WriterError>;

    /// Tear down backend resources after the final flush.
    async fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }
}

/// Size- and time-triggered batch accumulator
///
/// Construction spawns the flush-timer task; [`BatchEngine::close`]
/// cancels and joins it, so the task's lifetime is bound to the engine's.
pub struct BatchEngine {
    config: BatchConfig,
    target: Arc<dyn FlushTarget>,
    stats: Arc<StatsCore>,
    buffer: Mutex<Vec<HepPacket>>,
    closed: AtomicBool,
    flush_gate: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BatchEngine {
    /// Create an engine and start its flush timer.
    pub fn new(config: BatchConfig, target: Arc<dyn FlushTarget>) -> Arc<Self> {
        let engine = Arc::new(Self {
            buffer: Mutex::new(Vec::with_capacity(config.batch_size)),
            config,
            target,
            stats: Arc::new(StatsCore::new()),
            closed: AtomicBool::new(false),
            flush_gate: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
            timer: Mutex::new(None),
        });

        let timer = tokio::spawn(Self::run_timer(Arc::clone(&engine)));
        *engine.timer.lock() = Some(timer);

        engine
    }

    /// Periodic flush, cancelled on close.
    async fn run_timer(engine: Arc<Self>) {
        let period = engine.config.flush_interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = engine.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // Failures are already recorded in stats; the timer just
                    // keeps ticking.
                    if let Err(e) = engine.flush().await {
                        tracing::debug!(error = %e, "interval flush failed");
                    }
                }
            }
        }
    }

    /// Accept one packet.
    ///
    /// Non-suspending unless the append crosses the batch threshold, in
    /// which case the triggered flush completes before returning so batch
    /// boundaries are deterministic.
    pub async fn submit(&self, packet: HepPacket) -> Result<(), WriterError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WriterError::Closed);
        }

        let should_flush = {
            let mut buffer = self.buffer.lock();
            if let Some(cap) = self.config.max_buffered {
                if buffer.len() >= cap {
                    return Err(WriterError::Backpressure);
                }
            }
            buffer.push(packet);
            buffer.len() >= self.config.batch_size
        };

        self.stats.record_received(1);

        if should_flush {
            // A failed flush drops its batch and is recorded in stats; the
            // submit that triggered it still succeeded.
            let _ = self.flush().await;
        }

        Ok(())
    }

    /// Drain the buffer through the target.
    ///
    /// Serialised by the flush gate; the buffer lock is held only for the
    /// swap, so submits are not blocked while the backend works.
    pub async fn flush(&self) -> Result<(), WriterError> {
        let _gate = self.flush_gate.lock().await;

        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return Ok(());
            }
            std::mem::replace(&mut *buffer, Vec::with_capacity(self.config.batch_size))
        };
        let count = batch.len() as u64;

        match self.target.flush(batch).await {
            Ok(outcome) => {
                self.stats.record_written(outcome.written, outcome.bytes);
                if outcome.failed > 0 {
                    self.stats.record_error(
                        outcome.failed,
                        format!("{} packets rejected by backend", outcome.failed),
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.stats.record_error(1, e.to_string());
                tracing::warn!(error = %e, dropped = count, "flush failed, dropping batch");
                Err(e)
            }
        }
    }

    /// Final flush and timer teardown. Idempotent; later submits fail with
    /// [`WriterError::Closed`].
    pub async fn close(&self) -> Result<(), WriterError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.cancel.cancel();
        let timer = self.timer.lock().take();
        if let Some(handle) = timer {
            let _ = handle.await;
        }

        let result = self.flush().await;
        self.target.close().await?;
        result
    }

    /// Stats snapshot for this engine's writer.
    pub fn stats(&self) -> WriterStats {
        self.stats.snapshot()
    }

    /// Packets currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
