//! Bitmap commands.

use redis::cmd;
use redline_core::CacheResult;

use crate::manager::RedisManager;

impl RedisManager {
    /// Read one bit; absent keys read as zero.
    pub async fn getbit(&self, key: &str, offset: u64) -> CacheResult<bool> {
        let mut command = cmd("GETBIT");
        command.arg(key).arg(offset);
        self.command(&command).await
    }

    /// Write one bit; returns the previous value.
    pub async fn setbit(&self, key: &str, offset: u64, value: bool) -> CacheResult<bool> {
        let mut command = cmd("SETBIT");
        command.arg(key).arg(offset).arg(i32::from(value));
        self.command(&command).await
    }

    /// Count set bits across the whole value.
    pub async fn bitcount(&self, key: &str) -> CacheResult<i64> {
        let mut command = cmd("BITCOUNT");
        command.arg(key);
        self.command(&command).await
    }

    /// Count set bits inside a byte range.
    pub async fn bitcount_range(&self, key: &str, start: i64, end: i64) -> CacheResult<i64> {
        let mut command = cmd("BITCOUNT");
        command.arg(key).arg(start).arg(end);
        self.command(&command).await
    }
}
