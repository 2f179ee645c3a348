//! String-value commands.
//!
//! Reads come in two typed entry points per operation (UTF-8 and raw
//! bytes) instead of a runtime codec tag; the expected representation is
//! part of the call signature.

use std::time::Duration;

use redis::{ToRedisArgs, cmd};
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Fetch a key as UTF-8. `None` when the key is absent.
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut command = cmd("GET");
        command.arg(key);
        self.command(&command).await
    }

    /// Fetch a key as raw bytes. `None` when the key is absent.
    pub async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut command = cmd("GET");
        command.arg(key);
        self.command(&command).await
    }

    /// Set a key without expiry.
    pub async fn set<V: ToRedisArgs>(&self, key: &str, value: V) -> CacheResult<()> {
        let mut command = cmd("SET");
        command.arg(key).arg(value);
        self.command(&command).await
    }

    /// Set a key with a millisecond-precision TTL.
    pub async fn set_with_expiry<V: ToRedisArgs>(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
    ) -> CacheResult<()> {
        let mut command = cmd("SET");
        command
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        self.command(&command).await
    }

    /// Set only when absent, with an optional TTL. `true` when the value
    /// was written. A zero `ttl` means no expiry.
    pub async fn set_nx<V: ToRedisArgs>(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let mut command = cmd("SET");
        command.arg(key).arg(value).arg("NX");
        if !ttl.is_zero() {
            command
                .arg("PX")
                .arg(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        }
        let reply: Option<String> = self.command(&command).await?;
        Ok(reply.is_some())
    }

    /// Swap in a new value and return the previous one, if any.
    pub async fn get_set<V: ToRedisArgs>(
        &self,
        key: &str,
        value: V,
    ) -> CacheResult<Option<String>> {
        let mut command = cmd("GETSET");
        command.arg(key).arg(value);
        self.command(&command).await
    }

    /// Fetch several keys as UTF-8; absent keys come back as `None` in
    /// position.
    pub async fn mget(&self, keys: &[&str]) -> CacheResult<Vec<Option<String>>> {
        let mut command = cmd("MGET");
        command.arg(keys);
        self.command(&command).await
    }

    /// Fetch several keys as raw bytes.
    pub async fn mget_bytes(&self, keys: &[&str]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        let mut command = cmd("MGET");
        command.arg(keys);
        self.command(&command).await
    }

    /// Set several key-value pairs in one round trip.
    pub async fn mset<V: ToRedisArgs>(&self, pairs: &[(&str, V)]) -> CacheResult<()> {
        let mut command = cmd("MSET");
        for (key, value) in pairs {
            command.arg(key).arg(value);
        }
        self.command(&command).await
    }

    /// Increment by one; absent keys start at zero.
    pub async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("INCR");
        command.arg(key);
        self.command(&command).await
    }

    /// Increment by `delta`.
    pub async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut command = cmd("INCRBY");
        command.arg(key).arg(delta);
        self.command(&command).await
    }

    /// Decrement by one.
    pub async fn decr(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("DECR");
        command.arg(key);
        self.command(&command).await
    }

    /// Decrement by `delta`.
    pub async fn decr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut command = cmd("DECRBY");
        command.arg(key).arg(delta);
        self.command(&command).await
    }
}
