//! Sorted-set commands.

use redis::{ToRedisArgs, cmd};
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Add one member; returns 1 when it was new.
    pub async fn zadd<M: ToRedisArgs>(&self, key: &str, score: f64, member: M) -> CacheResult<i64> {
        let mut command = cmd("ZADD");
        command.arg(key).arg(score).arg(member);
        self.command(&command).await
    }

    /// Add several members; returns how many were new.
    pub async fn zadd_multiple<M: ToRedisArgs>(
        &self,
        key: &str,
        members: &[(f64, M)],
    ) -> CacheResult<i64> {
        let mut command = cmd("ZADD");
        command.arg(key);
        for (score, member) in members {
            command.arg(*score).arg(member);
        }
        self.command(&command).await
    }

    /// Remove members; returns how many existed.
    pub async fn zrem<M: ToRedisArgs>(&self, key: &str, members: &[M]) -> CacheResult<i64> {
        let mut command = cmd("ZREM");
        command.arg(key);
        for member in members {
            command.arg(member);
        }
        self.command(&command).await
    }

    /// Members in rank order over `[start, stop]`.
    pub async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        let mut command = cmd("ZRANGE");
        command.arg(key).arg(start).arg(stop);
        self.command(&command).await
    }

    /// Members in reverse rank order over `[start, stop]`.
    pub async fn zrevrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<String>> {
        let mut command = cmd("ZREVRANGE");
        command.arg(key).arg(start).arg(stop);
        self.command(&command).await
    }

    /// Members with their scores over `[start, stop]`.
    pub async fn zrange_withscores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<(String, f64)>> {
        let mut command = cmd("ZRANGE");
        command.arg(key).arg(start).arg(stop).arg("WITHSCORES");
        self.command(&command).await
    }

    /// Score of one member, if present.
    pub async fn zscore<M: ToRedisArgs>(&self, key: &str, member: M) -> CacheResult<Option<f64>> {
        let mut command = cmd("ZSCORE");
        command.arg(key).arg(member);
        self.command(&command).await
    }

    pub async fn zcard(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("ZCARD");
        command.arg(key);
        self.command(&command).await
    }

    /// Count members with scores inside the given bounds; the bounds use
    /// the store's syntax (`-inf`, `+inf`, `(5` for exclusive).
    pub async fn zcount(&self, key: &str, min: &str, max: &str) -> CacheResult<i64> {
        let mut command = cmd("ZCOUNT");
        command.arg(key).arg(min).arg(max);
        self.command(&command).await
    }

    /// Ascending rank of one member, if present.
    pub async fn zrank<M: ToRedisArgs>(&self, key: &str, member: M) -> CacheResult<Option<i64>> {
        let mut command = cmd("ZRANK");
        command.arg(key).arg(member);
        self.command(&command).await
    }

    /// Descending rank of one member, if present.
    pub async fn zrevrank<M: ToRedisArgs>(&self, key: &str, member: M) -> CacheResult<Option<i64>> {
        let mut command = cmd("ZREVRANK");
        command.arg(key).arg(member);
        self.command(&command).await
    }

    /// Add `delta` to a member's score; returns the new score.
    pub async fn zincr_by<M: ToRedisArgs>(
        &self,
        key: &str,
        delta: f64,
        member: M,
    ) -> CacheResult<f64> {
        let mut command = cmd("ZINCRBY");
        command.arg(key).arg(delta).arg(member);
        self.command(&command).await
    }
}
