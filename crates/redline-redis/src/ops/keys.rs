//! Generic key commands.

use std::time::Duration;

use redis::cmd;
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Delete keys; returns how many existed.
    pub async fn del(&self, keys: &[&str]) -> CacheResult<i64> {
        let mut command = cmd("DEL");
        command.arg(keys);
        self.command(&command).await
    }

    /// Count how many of the given keys exist.
    pub async fn exists(&self, keys: &[&str]) -> CacheResult<i64> {
        let mut command = cmd("EXISTS");
        command.arg(keys);
        self.command(&command).await
    }

    /// Set a TTL in whole seconds. `false` when the key is absent.
    pub async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut command = cmd("EXPIRE");
        command.arg(key).arg(ttl.as_secs() as i64);
        self.command(&command).await
    }

    /// Set a TTL with millisecond precision. `false` when the key is
    /// absent.
    pub async fn pexpire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut command = cmd("PEXPIRE");
        command.arg(key).arg(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
        self.command(&command).await
    }

    /// Remaining TTL in seconds; -1 without expiry, -2 when absent.
    pub async fn ttl(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("TTL");
        command.arg(key);
        self.command(&command).await
    }

    /// Rename a key. A missing source key is `KEY_NOT_FOUND`.
    pub async fn rename(&self, key: &str, new_key: &str) -> CacheResult<()> {
        let mut command = cmd("RENAME");
        command.arg(key).arg(new_key);
        self.command(&command).await
    }

    /// Rename only when the target does not exist yet.
    pub async fn rename_nx(&self, key: &str, new_key: &str) -> CacheResult<bool> {
        let mut command = cmd("RENAMENX");
        command.arg(key).arg(new_key);
        self.command(&command).await
    }

    /// Store-side type name of the value at `key` ("none" when absent).
    pub async fn key_type(&self, key: &str) -> CacheResult<String> {
        let mut command = cmd("TYPE");
        command.arg(key);
        self.command(&command).await
    }

    /// All keys matching a glob pattern. Full-scan; prefer [`scan`] on
    /// anything but small datasets.
    ///
    /// [`scan`]: RedisManager::scan
    pub async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut command = cmd("KEYS");
        command.arg(pattern);
        self.command(&command).await
    }

    /// One cursor step over keys matching `pattern`. Returns the next
    /// cursor (0 when the iteration is complete) and a page of keys.
    pub async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> CacheResult<(u64, Vec<String>)> {
        let mut command = cmd("SCAN");
        command
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        self.command(&command).await
    }
}
