//! Batched command execution.
//!
//! A [`CommandBatch`] queues commands locally and ships them in one
//! round trip; `atomic()` wraps the batch in MULTI/EXEC so the store
//! applies it as a unit. Execution goes through the manager's gate and
//! statistics path like any single operation.

use std::time::Duration;

use redis::{Pipeline, ToRedisArgs, Value};
use redline_core::CacheResult;

use crate::manager::RedisManager;

/// Builder for a batched round trip. Replies come back as raw values in
/// queue order from [`RedisManager::exec_batch`].
pub struct CommandBatch {
    pipe: Pipeline,
    queued: usize,
}

impl Default for CommandBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBatch {
    pub fn new() -> Self {
        Self {
            pipe: Pipeline::new(),
            queued: 0,
        }
    }

    /// Execute the batch inside MULTI/EXEC.
    pub fn atomic(&mut self) -> &mut Self {
        self.pipe.atomic();
        self
    }

    /// Commands queued so far.
    pub fn len(&self) -> usize {
        self.queued
    }

    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    pub fn set<V: ToRedisArgs>(&mut self, key: &str, value: V) -> &mut Self {
        self.push().cmd("SET").arg(key).arg(value);
        self
    }

    pub fn set_with_expiry<V: ToRedisArgs>(
        &mut self,
        key: &str,
        value: V,
        ttl: Duration,
    ) -> &mut Self {
        self.push()
            .cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        self
    }

    pub fn get(&mut self, key: &str) -> &mut Self {
        self.push().cmd("GET").arg(key);
        self
    }

    pub fn del(&mut self, keys: &[&str]) -> &mut Self {
        self.push().cmd("DEL").arg(keys);
        self
    }

    pub fn exists(&mut self, keys: &[&str]) -> &mut Self {
        self.push().cmd("EXISTS").arg(keys);
        self
    }

    pub fn expire(&mut self, key: &str, ttl: Duration) -> &mut Self {
        self.push().cmd("EXPIRE").arg(key).arg(ttl.as_secs() as i64);
        self
    }

    pub fn incr_by(&mut self, key: &str, delta: i64) -> &mut Self {
        self.push().cmd("INCRBY").arg(key).arg(delta);
        self
    }

    pub fn decr_by(&mut self, key: &str, delta: i64) -> &mut Self {
        self.push().cmd("DECRBY").arg(key).arg(delta);
        self
    }

    pub fn hset<V: ToRedisArgs>(&mut self, key: &str, field: &str, value: V) -> &mut Self {
        self.push().cmd("HSET").arg(key).arg(field).arg(value);
        self
    }

    pub fn hget(&mut self, key: &str, field: &str) -> &mut Self {
        self.push().cmd("HGET").arg(key).arg(field);
        self
    }

    pub fn lpush<V: ToRedisArgs>(&mut self, key: &str, value: V) -> &mut Self {
        self.push().cmd("LPUSH").arg(key).arg(value);
        self
    }

    pub fn rpush<V: ToRedisArgs>(&mut self, key: &str, value: V) -> &mut Self {
        self.push().cmd("RPUSH").arg(key).arg(value);
        self
    }

    pub fn sadd<V: ToRedisArgs>(&mut self, key: &str, member: V) -> &mut Self {
        self.push().cmd("SADD").arg(key).arg(member);
        self
    }

    pub fn zadd<M: ToRedisArgs>(&mut self, key: &str, score: f64, member: M) -> &mut Self {
        self.push().cmd("ZADD").arg(key).arg(score).arg(member);
        self
    }

    fn push(&mut self) -> &mut Pipeline {
        self.queued += 1;
        &mut self.pipe
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipe
    }
}

impl RedisManager {
    /// Ship a batch in one round trip and return the raw reply values in
    /// queue order. An empty batch is a no-op.
    pub async fn exec_batch(&self, batch: &CommandBatch) -> CacheResult<Vec<Value>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.pipeline_query(batch.pipeline()).await
    }
}
