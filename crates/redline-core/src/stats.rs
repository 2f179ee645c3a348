//! Operation statistics.
//!
//! Counters sit on the hot path of every operation, so the critical
//! section is a plain mutex held only for the increment. Reads take a
//! snapshot and never block writers for longer than one copy.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    total_ops: u64,
    error_ops: u64,
}

/// Monotonic operation counters with a fixed start time.
///
/// `error_ops` counts store-side failures only. Local rejections (health
/// gate, unregistered scripts, key-not-found reads) are not errors of the
/// store and stay out of the error rate.
#[derive(Debug)]
pub struct StatsRecorder {
    counters: Mutex<Counters>,
    started_at: Instant,
}

/// Point-in-time copy of the recorder, safe to hold across awaits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_ops: u64,
    pub error_ops: u64,
    pub uptime: Duration,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started_at: Instant::now(),
        }
    }

    pub fn record_op(&self) {
        let mut counters = self.counters.lock().expect("stats mutex poisoned");
        counters.total_ops = counters.total_ops.saturating_add(1);
    }

    pub fn record_error(&self) {
        let mut counters = self.counters.lock().expect("stats mutex poisoned");
        counters.error_ops = counters.error_ops.saturating_add(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters.lock().expect("stats mutex poisoned");
        StatsSnapshot {
            total_ops: counters.total_ops,
            error_ops: counters.error_ops,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Emit one snapshot as a structured log line.
    pub fn report(&self) {
        let snap = self.snapshot();
        tracing::info!(
            total_ops = snap.total_ops,
            error_ops = snap.error_ops,
            uptime_secs = snap.uptime.as_secs(),
            error_rate = format!("{:.2}%", snap.error_rate() * 100.0),
            "store operation stats"
        );
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSnapshot {
    /// Errors per operation in `[0.0, 1.0]`; zero when nothing ran yet.
    pub fn error_rate(&self) -> f64 {
        if self.total_ops == 0 {
            0.0
        } else {
            self.error_ops as f64 / self.total_ops as f64
        }
    }
}
