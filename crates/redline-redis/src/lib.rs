//! Resilient access layer over a Redis-compatible store.
//!
//! One [`RedisManager`] shields callers from the deployment shape of the
//! store (standalone node, replicated set with optional sentinel
//! failover, sharded cluster) and from transient connectivity failure,
//! while exposing atomic, race-free primitives (bounded counters,
//! distributed locks) built on server-side script evaluation.
//!
//! # Resilience model
//!
//! A background monitor probes the store on a fixed interval and keeps a
//! shared health flag. While the flag is down every operation fails fast
//! with a connectivity error, without touching the network; callers retry
//! after the next successful probe. Rejected calls are not replayed.
//!
//! # Lock consistency
//!
//! The lock primitives guarantee mutual exclusion through atomic
//! server-side evaluation, which is as strong as the deployment below:
//!
//! | Deployment | Mutual exclusion | Notes |
//! |------------|------------------|-------|
//! | Standalone | Strong | Full mutual exclusion |
//! | Sentinel / replicated | Weak | A lock can be lost during failover |
//! | Sharded | Weak | A lock can be lost during failover |
//!
//! # Example
//!
//! ```ignore
//! use redline_redis::{LockToken, RedisConfig, RedisManager};
//! use std::time::Duration;
//!
//! let manager = RedisManager::connect(RedisConfig::standalone("redis://127.0.0.1:6379")).await?;
//! let token = LockToken::random();
//! if manager.try_lock("jobs:reindex", &token, Duration::from_secs(30)).await? {
//!     // ... exclusive section ...
//!     manager.release_lock("jobs:reindex", &token).await?;
//! }
//! manager.shutdown().await;
//! ```

pub mod config;
mod convert;
mod health;
mod manager;
mod ops;
pub mod scripts;
mod session;

pub use config::{
    CommonOptions, RedisConfig, ReplicatedTopology, SentinelOptions, ShardedTopology,
    StandaloneTopology, Topology,
};
pub use manager::RedisManager;
pub use ops::{CommandBatch, CounterUpdate};
pub use scripts::{KeyArity, ScriptRegistry};

// The uniform result shape and the lock token live in the core crate;
// re-exported so callers need a single dependency.
pub use redline_core::{CacheError, CacheResult, ErrorKind, LockToken, StatsSnapshot};
