//! Background rotation driver.
//!
//! [`Ticker`] owns a named thread that wakes once per cadence, reads a
//! [`Clock`] and calls [`TimeBuffer::tick`]. Shutdown is signalled over
//! a crossbeam channel, so the thread stops promptly instead of
//! finishing its sleep.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use tally_core::{Aggregator, Clock, Key, SystemClock, Value};

use crate::buffer::TimeBuffer;

// ── Error types ──────────────────────────────────────────────────

/// Error starting or stopping a [`Ticker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    /// The cadence was zero.
    ZeroCadence,
    /// The OS refused to start the thread.
    ThreadSpawnFailed {
        /// The underlying I/O error, rendered.
        reason: String,
    },
    /// The tick thread panicked, usually inside an `on_evict` callback.
    Panicked,
}

impl std::fmt::Display for TickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroCadence => write!(f, "tick cadence must be non-zero"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn tick thread: {reason}")
            }
            Self::Panicked => write!(f, "tick thread panicked"),
        }
    }
}

impl std::error::Error for TickerError {}

// ── TickerReport ─────────────────────────────────────────────────

/// Totals accumulated by a ticker thread over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickerReport {
    /// `tick` calls made.
    pub ticks: u64,
    /// Intervals rotated through.
    pub rotations: u64,
    /// Entries evicted.
    pub evicted_entries: u64,
}

// ── Ticker ───────────────────────────────────────────────────────

/// Handle to a running tick thread.
///
/// Dropping the handle stops the thread and waits for it.
pub struct Ticker {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<TickerReport>>,
}

impl Ticker {
    /// Tick `buffer` against the wall clock once per bucket interval.
    pub fn start<K, V, A>(buffer: Arc<TimeBuffer<K, V, A>>) -> Result<Self, TickerError>
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + 'static,
    {
        let cadence = Duration::from_secs(buffer.interval_secs());
        Self::spawn(buffer, SystemClock, cadence)
    }

    /// Tick `buffer` against `clock` once per `cadence`.
    ///
    /// The first tick happens after one cadence has elapsed. A final
    /// tick is made on shutdown so that rotations due at that moment are
    /// not lost.
    pub fn spawn<K, V, A, C>(
        buffer: Arc<TimeBuffer<K, V, A>>,
        clock: C,
        cadence: Duration,
    ) -> Result<Self, TickerError>
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + 'static,
        C: Clock + 'static,
    {
        if cadence.is_zero() {
            return Err(TickerError::ZeroCadence);
        }
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let name = buffer.name().to_string();

        let handle = thread::Builder::new()
            .name("tally-tick".into())
            .spawn(move || {
                let mut report = TickerReport::default();
                loop {
                    let stop = match shutdown_rx.recv_timeout(cadence) {
                        Err(RecvTimeoutError::Timeout) => false,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                    };
                    let tick = buffer.tick(clock.now());
                    report.ticks += 1;
                    report.rotations += tick.rotations;
                    report.evicted_entries += tick.evicted_entries;
                    if stop {
                        break;
                    }
                }
                report
            })
            .map_err(|e| TickerError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        log::info!("ticker for {name:?} started, cadence {cadence:?}");
        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and return what it did.
    pub fn shutdown(mut self) -> Result<TickerReport, TickerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<TickerReport, TickerError> {
        // Dropping the sender also wakes the thread.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return Ok(TickerReport::default());
        };
        let report = handle.join().map_err(|_| TickerError::Panicked)?;
        log::info!(
            "ticker stopped after {} ticks, {} rotations, {} evicted",
            report.ticks,
            report.rotations,
            report.evicted_entries
        );
        Ok(report)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{e}");
        }
    }
}
