//! Topology-bound store sessions.
//!
//! A session is constructed once per manager, bound to exactly one
//! [`Topology`], and owns the connection pools for that topology. The
//! constructor performs one reachability probe with bounded retry; a
//! store that cannot be reached at construction is a fatal error and no
//! session is returned.

use std::sync::atomic::{AtomicUsize, Ordering};

use deadpool_redis::{Pool, PoolConfig, Runtime};
use futures::future::join_all;
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisFuture, Value};
use redline_core::{CacheError, CacheResult};

use crate::config::{CommonOptions, RedisConfig, Topology};
use crate::convert::classify_pool;

/// Live handle to the store for one topology.
pub(crate) struct StoreSession {
    pools: SessionPools,
    mode: &'static str,
}

enum SessionPools {
    Standalone(Pool),
    /// Failover-aware: the sentinel quorum resolves the primary and the
    /// pool re-resolves on failover, so one ping covers liveness.
    Sentinel(deadpool_redis::sentinel::Pool),
    /// Statically addressed replica set with no quorum logic; requests
    /// rotate across the node pools.
    Replicated {
        pools: Vec<Pool>,
        next: AtomicUsize,
    },
    /// Cluster pool for commands plus one single-connection pool per
    /// configured endpoint, used only by the liveness probe.
    Sharded {
        pool: deadpool_redis::cluster::Pool,
        probes: Vec<(String, Pool)>,
    },
}

/// Checked-out connection, uniform across topologies.
pub(crate) enum SessionConnection {
    Single(deadpool_redis::Connection),
    Sentinel(deadpool_redis::sentinel::Connection),
    Cluster(deadpool_redis::cluster::Connection),
}

impl StoreSession {
    /// Dial the configured topology and verify reachability.
    ///
    /// The probe retries `max_retries` times with doubling backoff; if it
    /// never succeeds the error is `CONNECTION_FAILED` regardless of the
    /// underlying failure, so callers can tell "store unreachable" from
    /// "store rejected the request".
    pub(crate) async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let common = &config.common;
        let pools = match &config.topology {
            Topology::Standalone(standalone) => {
                SessionPools::Standalone(build_pool(&standalone.url, common)?)
            }
            Topology::Replicated(replicated) => match &replicated.sentinel {
                Some(sentinel) => {
                    SessionPools::Sentinel(build_sentinel_pool(
                        &sentinel.urls,
                        &sentinel.master_name,
                        common,
                    )?)
                }
                None => {
                    let pools = replicated
                        .urls
                        .iter()
                        .map(|url| build_pool(url, common))
                        .collect::<CacheResult<Vec<_>>>()?;
                    SessionPools::Replicated {
                        pools,
                        next: AtomicUsize::new(0),
                    }
                }
            },
            Topology::Sharded(sharded) => {
                let mut probes = Vec::with_capacity(sharded.urls.len());
                for url in &sharded.urls {
                    probes.push((url.clone(), build_probe_pool(url, common)?));
                }
                SessionPools::Sharded {
                    pool: build_cluster_pool(&sharded.urls, common)?,
                    probes,
                }
            }
        };

        let session = Self {
            pools,
            mode: config.mode(),
        };
        session.probe_until_reachable(common).await?;
        tracing::info!(mode = session.mode, "store session established");
        Ok(session)
    }

    pub(crate) fn mode(&self) -> &'static str {
        self.mode
    }

    /// Check out one connection appropriate to the topology.
    pub(crate) async fn connection(&self) -> CacheResult<SessionConnection> {
        match &self.pools {
            SessionPools::Standalone(pool) => pool
                .get()
                .await
                .map(SessionConnection::Single)
                .map_err(classify_pool),
            SessionPools::Sentinel(pool) => pool
                .get()
                .await
                .map(SessionConnection::Sentinel)
                .map_err(classify_pool),
            SessionPools::Replicated { pools, next } => {
                let index = next.fetch_add(1, Ordering::Relaxed) % pools.len();
                pools[index]
                    .get()
                    .await
                    .map(SessionConnection::Single)
                    .map_err(classify_pool)
            }
            SessionPools::Sharded { pool, .. } => pool
                .get()
                .await
                .map(SessionConnection::Cluster)
                .map_err(classify_pool),
        }
    }

    /// Topology-specific liveness probe.
    ///
    /// Standalone and both replicated sub-modes answer with a single
    /// ping. A sharded session probes every configured endpoint and is
    /// live only when all of them answer; one dead endpoint marks the
    /// whole session unhealthy.
    pub(crate) async fn ping(&self) -> CacheResult<()> {
        match &self.pools {
            SessionPools::Sharded { probes, .. } => {
                let results = join_all(probes.iter().map(|(url, pool)| async move {
                    ping_pool(pool).await.map_err(|err| {
                        CacheError::new(err.kind(), format!("shard endpoint {url}: {err}"))
                    })
                }))
                .await;
                for result in results {
                    result?;
                }
                Ok(())
            }
            _ => {
                let mut conn = self.connection().await?;
                let _: String = redis::cmd("PING")
                    .query_async(&mut conn)
                    .await
                    .map_err(crate::convert::classify)?;
                Ok(())
            }
        }
    }

    async fn probe_until_reachable(&self, common: &CommonOptions) -> CacheResult<()> {
        let mut backoff = common.min_retry_backoff;
        let attempts = common.max_retries.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            match self.ping().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::debug!(
                        mode = self.mode,
                        attempt = attempt + 1,
                        error = %err,
                        "initial reachability probe failed"
                    );
                    last_err = Some(err);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(common.max_retry_backoff);
                    }
                }
            }
        }
        let cause = last_err.expect("at least one probe attempt ran");
        Err(CacheError::connection_failed(format!(
            "store unreachable after {attempts} probe attempts ({}): {cause}",
            self.mode
        )))
    }
}

async fn ping_pool(pool: &Pool) -> CacheResult<()> {
    let mut conn = pool.get().await.map_err(classify_pool)?;
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(crate::convert::classify)?;
    Ok(())
}

fn pool_config(common: &CommonOptions, max_size: usize) -> PoolConfig {
    let mut pool = PoolConfig::new(max_size);
    pool.timeouts.wait = Some(common.pool_timeout);
    pool.timeouts.create = Some(common.dial_timeout);
    pool.timeouts.recycle = Some(common.dial_timeout);
    pool
}

fn build_pool(url: &str, common: &CommonOptions) -> CacheResult<Pool> {
    let mut cfg = deadpool_redis::Config::from_url(url);
    cfg.pool = Some(pool_config(common, common.pool_size));
    cfg.create_pool(Some(Runtime::Tokio1)).map_err(|err| {
        CacheError::with_source(
            redline_core::ErrorKind::ConnectionFailed,
            format!("failed to build connection pool for {url}"),
            err,
        )
    })
}

// Probe pools exist only so the health loop can address one endpoint at
// a time; one connection each is enough.
fn build_probe_pool(url: &str, common: &CommonOptions) -> CacheResult<Pool> {
    let mut cfg = deadpool_redis::Config::from_url(url);
    cfg.pool = Some(pool_config(common, 1));
    cfg.create_pool(Some(Runtime::Tokio1)).map_err(|err| {
        CacheError::with_source(
            redline_core::ErrorKind::ConnectionFailed,
            format!("failed to build probe pool for {url}"),
            err,
        )
    })
}

fn build_sentinel_pool(
    urls: &[String],
    master_name: &str,
    common: &CommonOptions,
) -> CacheResult<deadpool_redis::sentinel::Pool> {
    use deadpool_redis::sentinel::{Config as SentinelConfig, SentinelServerType};

    let mut cfg = SentinelConfig::from_urls(
        urls.to_vec(),
        master_name.to_string(),
        SentinelServerType::Master,
    );
    cfg.pool = Some(pool_config(common, common.pool_size));
    cfg.create_pool(Some(Runtime::Tokio1)).map_err(|err| {
        CacheError::with_source(
            redline_core::ErrorKind::ConnectionFailed,
            format!("failed to build sentinel pool for master '{master_name}'"),
            err,
        )
    })
}

fn build_cluster_pool(
    urls: &[String],
    common: &CommonOptions,
) -> CacheResult<deadpool_redis::cluster::Pool> {
    let mut cfg = deadpool_redis::cluster::Config::from_urls(urls.to_vec());
    cfg.pool = Some(pool_config(common, common.pool_size));
    cfg.create_pool(Some(Runtime::Tokio1)).map_err(|err| {
        CacheError::with_source(
            redline_core::ErrorKind::ConnectionFailed,
            "failed to build cluster pool",
            err,
        )
    })
}

impl ConnectionLike for SessionConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            SessionConnection::Single(conn) => conn.req_packed_command(cmd),
            SessionConnection::Sentinel(conn) => conn.req_packed_command(cmd),
            SessionConnection::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        pipeline: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            SessionConnection::Single(conn) => conn.req_packed_commands(pipeline, offset, count),
            SessionConnection::Sentinel(conn) => conn.req_packed_commands(pipeline, offset, count),
            SessionConnection::Cluster(conn) => conn.req_packed_commands(pipeline, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            SessionConnection::Single(conn) => conn.get_db(),
            SessionConnection::Sentinel(conn) => conn.get_db(),
            SessionConnection::Cluster(conn) => conn.get_db(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pool_config_applies_common_timeouts() {
        let common = CommonOptions {
            pool_timeout: Duration::from_secs(7),
            dial_timeout: Duration::from_secs(2),
            ..CommonOptions::default()
        };
        let cfg = pool_config(&common, 4);
        assert_eq!(cfg.max_size, 4);
        assert_eq!(cfg.timeouts.wait, Some(Duration::from_secs(7)));
        assert_eq!(cfg.timeouts.create, Some(Duration::from_secs(2)));
    }

    #[test]
    fn pool_builders_accept_valid_urls() {
        let common = CommonOptions::default();
        assert!(build_pool("redis://127.0.0.1:6379", &common).is_ok());
        assert!(build_probe_pool("redis://127.0.0.1:7000", &common).is_ok());
        assert!(build_cluster_pool(&["redis://127.0.0.1:7000".to_string()], &common).is_ok());
    }

    #[test]
    fn pool_builder_rejects_malformed_url() {
        let common = CommonOptions::default();
        assert!(build_pool("not a url", &common).is_err());
    }
}
