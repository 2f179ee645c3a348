//! List commands.

use redis::{ToRedisArgs, cmd};
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Push values to the head; returns the new list length.
    pub async fn lpush<V: ToRedisArgs>(&self, key: &str, values: &[V]) -> CacheResult<i64> {
        let mut command = cmd("LPUSH");
        command.arg(key);
        for value in values {
            command.arg(value);
        }
        self.command(&command).await
    }

    /// Push values to the tail; returns the new list length.
    pub async fn rpush<V: ToRedisArgs>(&self, key: &str, values: &[V]) -> CacheResult<i64> {
        let mut command = cmd("RPUSH");
        command.arg(key);
        for value in values {
            command.arg(value);
        }
        self.command(&command).await
    }

    /// Pop from the head. `None` when the list is empty or absent.
    pub async fn lpop(&self, key: &str) -> CacheResult<Option<String>> {
        let mut command = cmd("LPOP");
        command.arg(key);
        self.command(&command).await
    }

    /// Pop from the tail. `None` when the list is empty or absent.
    pub async fn rpop(&self, key: &str) -> CacheResult<Option<String>> {
        let mut command = cmd("RPOP");
        command.arg(key);
        self.command(&command).await
    }

    pub async fn llen(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("LLEN");
        command.arg(key);
        self.command(&command).await
    }

    /// Elements in `[start, stop]`, negative indices counting from the
    /// tail.
    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        let mut command = cmd("LRANGE");
        command.arg(key).arg(start).arg(stop);
        self.command(&command).await
    }

    /// Remove up to `count` occurrences of `value` (sign selects the
    /// scan direction); returns how many were removed.
    pub async fn lrem<V: ToRedisArgs>(
        &self,
        key: &str,
        count: isize,
        value: V,
    ) -> CacheResult<i64> {
        let mut command = cmd("LREM");
        command.arg(key).arg(count).arg(value);
        self.command(&command).await
    }

    /// Trim the list to `[start, stop]`.
    pub async fn ltrim(&self, key: &str, start: isize, stop: isize) -> CacheResult<()> {
        let mut command = cmd("LTRIM");
        command.arg(key).arg(start).arg(stop);
        self.command(&command).await
    }
}
