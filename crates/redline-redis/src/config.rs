//! Connection configuration.
//!
//! A manager is bound to exactly one [`Topology`] at construction and
//! never re-binds. Validation runs once, before any dialing, and reports
//! the offending field; everything tunable carries a default so an empty
//! `CommonOptions` is usable as-is.

use std::time::Duration;

use redline_core::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};

/// Deployment shape of the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Topology {
    /// Single addressable node.
    Standalone(StandaloneTopology),
    /// Primary plus replicas, with or without a sentinel quorum.
    Replicated(ReplicatedTopology),
    /// Sharded cluster with client-side redirect handling.
    Sharded(ShardedTopology),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandaloneTopology {
    /// Node URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatedTopology {
    /// Node URLs, used directly when no sentinel quorum is configured.
    pub urls: Vec<String>,
    /// Optional failover coordination. When present, `urls` above are
    /// ignored in favor of the primary the sentinels advertise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<SentinelOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelOptions {
    /// Service name the sentinels monitor.
    pub master_name: String,
    /// Sentinel endpoints, e.g. `redis://127.0.0.1:26379`.
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardedTopology {
    /// Shard endpoints. The probe loop contacts each one individually.
    pub urls: Vec<String>,
    /// Upper bound on MOVED/ASK redirects per command.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
}

fn default_max_redirects() -> u32 {
    3
}

/// Tunables shared by every topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonOptions {
    /// Connections kept per pool.
    pub pool_size: usize,
    /// Wait bound when the pool is exhausted.
    pub pool_timeout: Duration,
    /// Bound on establishing one new connection.
    pub dial_timeout: Duration,
    /// Transport-level read deadline hint.
    pub read_timeout: Duration,
    /// Transport-level write deadline hint.
    pub write_timeout: Duration,
    /// Attempts for the initial reachability probe.
    pub max_retries: u32,
    /// First retry backoff; doubled per attempt.
    pub min_retry_backoff: Duration,
    /// Backoff ceiling.
    pub max_retry_backoff: Duration,
    /// Interval between background liveness probes.
    pub health_check_interval: Duration,
    /// Whether the periodic stats report task runs.
    pub enable_stats: bool,
    /// Interval between stats report lines.
    pub stats_interval: Duration,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            pool_size: 10,
            pool_timeout: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            max_retries: 3,
            min_retry_backoff: Duration::from_millis(8),
            max_retry_backoff: Duration::from_millis(512),
            health_check_interval: Duration::from_secs(30),
            enable_stats: false,
            stats_interval: Duration::from_secs(60),
        }
    }
}

/// Complete manager configuration: one topology plus the shared tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(flatten)]
    pub topology: Topology,
    #[serde(default)]
    pub common: CommonOptions,
}

impl RedisConfig {
    pub fn standalone(url: impl Into<String>) -> Self {
        Self {
            topology: Topology::Standalone(StandaloneTopology { url: url.into() }),
            common: CommonOptions::default(),
        }
    }

    pub fn replicated(urls: Vec<String>) -> Self {
        Self {
            topology: Topology::Replicated(ReplicatedTopology {
                urls,
                sentinel: None,
            }),
            common: CommonOptions::default(),
        }
    }

    pub fn sentinel(sentinel_urls: Vec<String>, master_name: impl Into<String>) -> Self {
        Self {
            topology: Topology::Replicated(ReplicatedTopology {
                urls: Vec::new(),
                sentinel: Some(SentinelOptions {
                    master_name: master_name.into(),
                    urls: sentinel_urls,
                }),
            }),
            common: CommonOptions::default(),
        }
    }

    pub fn sharded(urls: Vec<String>) -> Self {
        Self {
            topology: Topology::Sharded(ShardedTopology {
                urls,
                max_redirects: default_max_redirects(),
            }),
            common: CommonOptions::default(),
        }
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.common.pool_size = size;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.common.health_check_interval = interval;
        self
    }

    pub fn with_stats_reporting(mut self, interval: Duration) -> Self {
        self.common.enable_stats = true;
        self.common.stats_interval = interval;
        self
    }

    /// Validate before dialing. Violations are `INVALID_CONFIG` and name
    /// the field at fault.
    pub fn validate(&self) -> CacheResult<()> {
        if self.common.pool_size == 0 {
            return Err(CacheError::invalid_config("pool_size must be at least 1"));
        }
        if self.common.health_check_interval.is_zero() {
            return Err(CacheError::invalid_config(
                "health_check_interval must be positive",
            ));
        }
        match &self.topology {
            Topology::Standalone(standalone) => {
                if standalone.url.is_empty() {
                    return Err(CacheError::invalid_config("standalone.url is required"));
                }
            }
            Topology::Replicated(replicated) => match &replicated.sentinel {
                Some(sentinel) => {
                    if sentinel.master_name.is_empty() {
                        return Err(CacheError::invalid_config(
                            "sentinel.master_name is required when sentinel is configured",
                        ));
                    }
                    if sentinel.urls.is_empty() {
                        return Err(CacheError::invalid_config(
                            "sentinel.urls is required when sentinel is configured",
                        ));
                    }
                }
                None => {
                    if replicated.urls.is_empty() {
                        return Err(CacheError::invalid_config("replicated.urls is required"));
                    }
                }
            },
            Topology::Sharded(sharded) => {
                if sharded.urls.is_empty() {
                    return Err(CacheError::invalid_config("sharded.urls is required"));
                }
                if sharded.max_redirects == 0 {
                    return Err(CacheError::invalid_config(
                        "sharded.max_redirects must be at least 1",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Short label for log lines.
    pub fn mode(&self) -> &'static str {
        match &self.topology {
            Topology::Standalone(_) => "standalone",
            Topology::Replicated(replicated) if replicated.sentinel.is_some() => "sentinel",
            Topology::Replicated(_) => "replicated",
            Topology::Sharded(_) => "sharded",
        }
    }
}
