//! Hash commands.

use std::collections::HashMap;

use redis::{ToRedisArgs, cmd};
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Fetch one field. `None` when the key or field is absent.
    pub async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let mut command = cmd("HGET");
        command.arg(key).arg(field);
        self.command(&command).await
    }

    /// Set one field; returns how many fields were newly created.
    pub async fn hset<V: ToRedisArgs>(
        &self,
        key: &str,
        field: &str,
        value: V,
    ) -> CacheResult<i64> {
        let mut command = cmd("HSET");
        command.arg(key).arg(field).arg(value);
        self.command(&command).await
    }

    /// Set several fields in one round trip; returns how many were newly
    /// created.
    pub async fn hset_multiple<V: ToRedisArgs>(
        &self,
        key: &str,
        entries: &[(&str, V)],
    ) -> CacheResult<i64> {
        let mut command = cmd("HSET");
        command.arg(key);
        for (field, value) in entries {
            command.arg(field).arg(value);
        }
        self.command(&command).await
    }

    /// Delete fields; returns how many existed.
    pub async fn hdel(&self, key: &str, fields: &[&str]) -> CacheResult<i64> {
        let mut command = cmd("HDEL");
        command.arg(key).arg(fields);
        self.command(&command).await
    }

    pub async fn hexists(&self, key: &str, field: &str) -> CacheResult<bool> {
        let mut command = cmd("HEXISTS");
        command.arg(key).arg(field);
        self.command(&command).await
    }

    /// The whole hash; empty map when the key is absent.
    pub async fn hget_all(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut command = cmd("HGETALL");
        command.arg(key);
        self.command(&command).await
    }

    pub async fn hkeys(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut command = cmd("HKEYS");
        command.arg(key);
        self.command(&command).await
    }

    pub async fn hvals(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut command = cmd("HVALS");
        command.arg(key);
        self.command(&command).await
    }

    pub async fn hlen(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("HLEN");
        command.arg(key);
        self.command(&command).await
    }

    /// Increment one numeric field by `delta`; absent fields start at
    /// zero.
    pub async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        let mut command = cmd("HINCRBY");
        command.arg(key).arg(field).arg(delta);
        self.command(&command).await
    }

    /// Fetch several fields; absent fields come back as `None` in
    /// position.
    pub async fn hmget(&self, key: &str, fields: &[&str]) -> CacheResult<Vec<Option<String>>> {
        let mut command = cmd("HMGET");
        command.arg(key).arg(fields);
        self.command(&command).await
    }
}
