//! Background health monitoring.
//!
//! One monitor task per manager probes the session on a fixed interval
//! and maintains the shared `Healthy ⇄ Unhealthy` flag. Operations read
//! the flag before dispatch and fail fast while it is down; they never
//! probe on their own, trading a staleness window of at most one tick
//! for a probe-free hot path.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redline_core::{CacheResult, StatsRecorder};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shared health flag. Written only by the monitor, read by every
/// operation; the lock is held for one bool access on either side.
#[derive(Debug)]
pub(crate) struct HealthState {
    healthy: bool,
}

impl HealthState {
    /// A session only exists after a successful reachability probe, so
    /// the flag starts healthy.
    pub(crate) fn new() -> Self {
        Self { healthy: true }
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.healthy
    }
}

/// Spawn the monitor loop.
///
/// Ticks start one full interval after spawn and missed ticks are
/// delayed, so probes run strictly one at a time. Each state transition
/// is logged exactly once; steady state is silent. A failed probe counts
/// one error in the statistics at the transition edge only.
pub(crate) fn spawn_monitor<P, F>(
    flag: Arc<RwLock<HealthState>>,
    interval: Duration,
    mode: &'static str,
    stats: Arc<StatsRecorder>,
    mut shutdown: watch::Receiver<bool>,
    probe: P,
) -> JoinHandle<()>
where
    P: Fn() -> F + Send + 'static,
    F: Future<Output = CacheResult<()>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = probe().await;
                    let mut state = flag.write().await;
                    let was_healthy = state.healthy;
                    state.healthy = result.is_ok();
                    drop(state);
                    match result {
                        Err(err) if was_healthy => {
                            tracing::warn!(mode, error = %err, "store health check failed");
                            stats.record_error();
                        }
                        Ok(()) if !was_healthy => {
                            tracing::info!(mode, "store health check recovered");
                        }
                        _ => {}
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use redline_core::CacheError;

    const TICK: Duration = Duration::from_secs(30);

    struct Probe {
        ok: AtomicBool,
        calls: AtomicU32,
    }

    fn spawn_with_probe(
        probe: Arc<Probe>,
    ) -> (
        Arc<RwLock<HealthState>>,
        watch::Sender<bool>,
        JoinHandle<()>,
    ) {
        let flag = Arc::new(RwLock::new(HealthState::new()));
        let stats = Arc::new(StatsRecorder::new());
        let (tx, rx) = watch::channel(false);
        let handle = spawn_monitor(
            Arc::clone(&flag),
            TICK,
            "standalone",
            stats,
            rx,
            move || {
                let probe = Arc::clone(&probe);
                async move {
                    probe.calls.fetch_add(1, Ordering::SeqCst);
                    if probe.ok.load(Ordering::SeqCst) {
                        Ok(())
                    } else {
                        Err(CacheError::connection_failed("probe refused"))
                    }
                }
            },
        );
        (flag, tx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn flag_follows_probe_outcome() {
        let probe = Arc::new(Probe {
            ok: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        });
        let (flag, _tx, _handle) = spawn_with_probe(Arc::clone(&probe));

        assert!(flag.read().await.is_healthy());

        probe.ok.store(false, Ordering::SeqCst);
        tokio::time::sleep(TICK + Duration::from_millis(10)).await;
        assert!(!flag.read().await.is_healthy());

        probe.ok.store(true, Ordering::SeqCst);
        tokio::time::sleep(TICK + Duration::from_millis(10)).await;
        assert!(flag.read().await.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn first_probe_waits_one_full_interval() {
        let probe = Arc::new(Probe {
            ok: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        });
        let (_flag, _tx, _handle) = spawn_with_probe(Arc::clone(&probe));

        tokio::time::sleep(TICK / 2).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(TICK).await;
        assert!(probe.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let probe = Arc::new(Probe {
            ok: AtomicBool::new(true),
            calls: AtomicU32::new(0),
        });
        let (flag, tx, handle) = spawn_with_probe(Arc::clone(&probe));

        tx.send_replace(true);
        handle.await.unwrap();

        // Loop is gone: flag no longer reacts to a failing probe.
        probe.ok.store(false, Ordering::SeqCst);
        tokio::time::sleep(TICK * 2).await;
        assert!(flag.read().await.is_healthy());
    }
}
