//! The manager: composition root and operation gate.
//!
//! `RedisManager` owns one topology-bound session, the script registry,
//! the health flag, and the statistics recorder, plus the two background
//! tasks (health monitor, optional stats reporter). Every operation runs
//! through the same path: count it, check the health gate, dispatch,
//! classify the outcome once.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redis::{Cmd, FromRedisValue, ToRedisArgs};
use redline_core::{CacheError, CacheResult, StatsRecorder, StatsSnapshot};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RedisConfig;
use crate::convert::classify;
use crate::health::{self, HealthState};
use crate::scripts::{KeyArity, ScriptRegistry};
use crate::session::StoreSession;

/// Resilient handle to a Redis-compatible store.
///
/// Construction dials the configured topology and is fatal on failure;
/// afterwards the manager trusts the background monitor's verdict instead
/// of probing per call. All operations return the uniform
/// [`CacheResult`] shape.
pub struct RedisManager {
    session: Arc<StoreSession>,
    registry: ScriptRegistry,
    stats: Arc<StatsRecorder>,
    health: Arc<RwLock<HealthState>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl RedisManager {
    /// Validate the configuration, dial the store, and start the
    /// background tasks. The built-in scripts are registered before the
    /// manager is returned.
    pub async fn connect(config: RedisConfig) -> CacheResult<Self> {
        config.validate()?;

        let session = Arc::new(StoreSession::connect(&config).await?);
        let stats = Arc::new(StatsRecorder::new());
        let health = Arc::new(RwLock::new(HealthState::new()));
        let (shutdown_tx, _) = watch::channel(false);

        let mut tasks = Vec::new();
        let probe_session = Arc::clone(&session);
        tasks.push(health::spawn_monitor(
            Arc::clone(&health),
            config.common.health_check_interval,
            session.mode(),
            Arc::clone(&stats),
            shutdown_tx.subscribe(),
            move || {
                let session = Arc::clone(&probe_session);
                async move { session.ping().await }
            },
        ));
        if config.common.enable_stats {
            tasks.push(spawn_stats_reporter(
                Arc::clone(&stats),
                config.common.stats_interval,
                shutdown_tx.subscribe(),
            ));
        }

        Ok(Self {
            session,
            registry: ScriptRegistry::with_builtins(),
            stats,
            health,
            shutdown_tx,
            tasks: Mutex::new(tasks),
            closed: AtomicBool::new(false),
        })
    }

    /// Last verdict of the background monitor.
    pub async fn is_healthy(&self) -> bool {
        self.health.read().await.is_healthy()
    }

    /// Point-in-time operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Topology label, e.g. `"standalone"` or `"sharded"`.
    pub fn mode(&self) -> &'static str {
        self.session.mode()
    }

    /// Register (or replace) a script under a logical name. Local only;
    /// the source is uploaded lazily on first evaluation.
    pub fn register_script(&self, name: &str, source: &str, key_arity: KeyArity) {
        self.registry.register(name, source, key_arity);
    }

    /// Registered script names, sorted.
    pub fn script_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Stop the background tasks and close the manager.
    ///
    /// Safe to call more than once; only the first call does anything.
    /// In-flight store calls are not aborted, they complete or fail on
    /// their own.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown_tx.send_replace(true);
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock().expect("task list mutex poisoned");
            guard.drain(..).collect()
        };
        for task in tasks {
            let _ = task.await;
        }
        tracing::info!(mode = self.session.mode(), "redis manager closed");
    }

    /// Fail fast while the monitor reports the store down. Zero network
    /// cost; callers retry after the next successful probe flips the
    /// flag back.
    pub(crate) async fn ensure_healthy(&self) -> CacheResult<()> {
        if self.health.read().await.is_healthy() {
            Ok(())
        } else {
            Err(CacheError::connection_failed(
                "store marked unhealthy; rejected without dispatch",
            ))
        }
    }

    /// Run one command through the uniform gate/classify path.
    pub(crate) async fn command<T: FromRedisValue>(&self, cmd: &Cmd) -> CacheResult<T> {
        self.stats.record_op();
        self.ensure_healthy().await?;
        let mut conn = self.session.connection().await.inspect_err(|_| {
            self.stats.record_error();
        })?;
        let result: Result<T, redis::RedisError> = cmd.query_async(&mut conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.note_store_error(classify(err))),
        }
    }

    /// Ship a prepared pipeline through the gate/classify path.
    pub(crate) async fn pipeline_query<T: FromRedisValue>(
        &self,
        pipe: &redis::Pipeline,
    ) -> CacheResult<T> {
        self.stats.record_op();
        self.ensure_healthy().await?;
        let mut conn = self.session.connection().await.inspect_err(|_| {
            self.stats.record_error();
        })?;
        let result: Result<T, redis::RedisError> = pipe.query_async(&mut conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.note_store_error(classify(err))),
        }
    }

    /// Evaluate a registered script atomically on the store.
    ///
    /// The upload is digest-first: the client sends the cached digest and
    /// transparently falls back to the source when the store does not
    /// know it yet. An unregistered name or a key-arity mismatch fails
    /// locally without a round trip.
    pub async fn eval<T, K, A>(&self, name: &str, keys: &[K], args: A) -> CacheResult<T>
    where
        T: FromRedisValue,
        K: ToRedisArgs,
        A: ToRedisArgs,
    {
        self.stats.record_op();
        self.ensure_healthy().await?;
        let entry = self.registry.entry(name)?;
        entry.check_keys(name, keys.len())?;

        let mut conn = self.session.connection().await.inspect_err(|_| {
            self.stats.record_error();
        })?;
        let mut invocation = entry.script().prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        invocation.arg(args);
        let result: Result<T, redis::RedisError> = invocation.invoke_async(&mut conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.note_store_error(classify(err))),
        }
    }

    /// Upload a registered script now and return its digest.
    pub async fn load_script(&self, name: &str) -> CacheResult<String> {
        self.stats.record_op();
        self.ensure_healthy().await?;
        let entry = self.registry.entry(name)?;
        let mut conn = self.session.connection().await.inspect_err(|_| {
            self.stats.record_error();
        })?;
        let result: Result<String, redis::RedisError> =
            entry.script().prepare_invoke().load_async(&mut conn).await;
        match result {
            Ok(sha) => Ok(sha),
            Err(err) => Err(self.note_store_error(classify(err))),
        }
    }

    // Key-not-found is a read outcome, not a store failure; everything
    // else that reaches here counts against the error rate.
    fn note_store_error(&self, err: CacheError) -> CacheError {
        if !err.is_key_not_found() {
            self.stats.record_error();
        }
        err
    }
}

impl Drop for RedisManager {
    fn drop(&mut self) {
        // Cooperative stop only; tasks observe the signal at their next
        // tick. An explicit shutdown() beforehand also awaits them.
        if !self.closed.load(Ordering::SeqCst) {
            self.shutdown_tx.send_replace(true);
        }
    }
}

fn spawn_stats_reporter(
    stats: Arc<StatsRecorder>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => stats.report(),
                _ = shutdown.changed() => break,
            }
        }
    })
}
