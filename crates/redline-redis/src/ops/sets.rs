//! Set commands.

use redis::{ToRedisArgs, cmd};
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Add members; returns how many were new.
    pub async fn sadd<V: ToRedisArgs>(&self, key: &str, members: &[V]) -> CacheResult<i64> {
        let mut command = cmd("SADD");
        command.arg(key);
        for member in members {
            command.arg(member);
        }
        self.command(&command).await
    }

    /// Remove members; returns how many existed.
    pub async fn srem<V: ToRedisArgs>(&self, key: &str, members: &[V]) -> CacheResult<i64> {
        let mut command = cmd("SREM");
        command.arg(key);
        for member in members {
            command.arg(member);
        }
        self.command(&command).await
    }

    pub async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut command = cmd("SMEMBERS");
        command.arg(key);
        self.command(&command).await
    }

    pub async fn sis_member<V: ToRedisArgs>(&self, key: &str, member: V) -> CacheResult<bool> {
        let mut command = cmd("SISMEMBER");
        command.arg(key).arg(member);
        self.command(&command).await
    }

    pub async fn scard(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("SCARD");
        command.arg(key);
        self.command(&command).await
    }
}
