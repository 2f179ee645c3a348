//! Atomic script primitives.
//!
//! Each operation here wraps one server-side script: the check and the
//! act run inside a single atomic evaluation, so concurrent callers are
//! strictly serialized by the store and no client-side interleaving can
//! break the invariant. Business outcomes (lock contended, ceiling
//! reached) are values; only transport failures and malformed use become
//! errors.

use std::time::Duration;

use redline_core::{CacheError, CacheResult, LockToken};

use crate::manager::RedisManager;
use crate::scripts;

/// Outcome of a TTL-refreshing bounded increment.
///
/// On the wire the ceiling case is the sentinel value -1; this enum is
/// the typed rendering so callers branch on a variant instead of
/// comparing against a magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The increment was applied; carries the new counter value.
    Applied(i64),
    /// The ceiling blocked the increment; nothing changed.
    AtCeiling,
}

impl CounterUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, CounterUpdate::Applied(_))
    }

    fn from_wire(value: i64) -> Self {
        if value < 0 {
            CounterUpdate::AtCeiling
        } else {
            CounterUpdate::Applied(value)
        }
    }
}

impl RedisManager {
    /// Increment `key` by `delta` unless the current value has reached
    /// `max`. Returns the resulting value either way; a blocked
    /// increment returns the unchanged current value as a success.
    pub async fn safe_incr(&self, key: &str, delta: i64, max: i64) -> CacheResult<i64> {
        self.eval(scripts::BOUNDED_INCR, &[key], (delta, max)).await
    }

    /// Decrement `key` by `delta` unless the current value is smaller
    /// than `delta`. Returns the resulting value either way.
    pub async fn safe_decr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.eval(scripts::BOUNDED_DECR, &[key], delta).await
    }

    /// Hash-field variant of [`safe_incr`](RedisManager::safe_incr).
    pub async fn safe_hincr(
        &self,
        key: &str,
        field: &str,
        delta: i64,
        max: i64,
    ) -> CacheResult<i64> {
        self.eval(scripts::BOUNDED_HINCR, &[key, field], (delta, max))
            .await
    }

    /// Hash-field variant of [`safe_decr`](RedisManager::safe_decr).
    pub async fn safe_hdecr(&self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        self.eval(scripts::BOUNDED_HDECR, &[key, field], delta).await
    }

    /// Bounded increment that also refreshes the key TTL inside the same
    /// atomic evaluation on every applied increment.
    ///
    /// `ttl` has whole-second resolution and must be at least one
    /// second.
    pub async fn incr_with_limit_and_expire(
        &self,
        key: &str,
        delta: i64,
        max: i64,
        ttl: Duration,
    ) -> CacheResult<CounterUpdate> {
        if ttl < Duration::from_secs(1) {
            return Err(CacheError::invalid_operation(
                "incr_with_limit_and_expire: ttl must be at least one second",
            ));
        }
        let value: i64 = self
            .eval(
                scripts::INCR_WITH_LIMIT_AND_EXPIRE,
                &[key],
                (delta, max, ttl.as_secs() as i64),
            )
            .await?;
        Ok(CounterUpdate::from_wire(value))
    }

    /// Refresh a key's TTL only when the key exists. `false` when it does
    /// not.
    pub async fn set_expire_if_exists(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let value: i64 = self
            .eval(scripts::EXPIRE_IF_EXISTS, &[key], ttl.as_secs() as i64)
            .await?;
        Ok(value == 1)
    }

    /// Delete a key only when it currently holds `expected`. `false` on
    /// mismatch or absence.
    pub async fn delete_if_value_matches(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let value: i64 = self
            .eval(scripts::DEL_IF_VALUE_MATCHES, &[key], expected)
            .await?;
        Ok(value == 1)
    }

    /// Try to take a distributed lock: set `key` to the token only when
    /// the key is absent, with a millisecond TTL. `false` means the lock
    /// is held by someone else; parameter misuse is `INVALID_OPERATION`,
    /// never confused with contention.
    pub async fn try_lock(
        &self,
        key: &str,
        token: &LockToken,
        ttl: Duration,
    ) -> CacheResult<bool> {
        check_lock_params("try_lock", token, Some(ttl))?;
        let value: i64 = self
            .eval(
                scripts::LOCK_ACQUIRE,
                &[key],
                (token.as_str(), ttl_millis(ttl)),
            )
            .await?;
        decode_lock_reply("try_lock", value)
    }

    /// Release a lock held under `token`. `false` when the key is absent
    /// or owned by a different token, so an expired holder can never
    /// release a lock someone else has since acquired.
    pub async fn release_lock(&self, key: &str, token: &LockToken) -> CacheResult<bool> {
        check_lock_params("release_lock", token, None)?;
        let value: i64 = self
            .eval(scripts::LOCK_RELEASE, &[key], token.as_str())
            .await?;
        decode_lock_reply("release_lock", value)
    }

    /// Refresh the TTL of a lock held under `token`. Same non-match
    /// semantics as [`release_lock`](RedisManager::release_lock): a
    /// stale holder cannot touch the new holder's expiry.
    pub async fn renew_lock(
        &self,
        key: &str,
        token: &LockToken,
        ttl: Duration,
    ) -> CacheResult<bool> {
        check_lock_params("renew_lock", token, Some(ttl))?;
        let value: i64 = self
            .eval(
                scripts::LOCK_RENEW,
                &[key],
                (token.as_str(), ttl_millis(ttl)),
            )
            .await?;
        decode_lock_reply("renew_lock", value)
    }

    /// Take every key in `keys` under one token, all-or-nothing. The
    /// check phase is read-only, so a failed attempt leaves no key
    /// behind; keys already held by the same token count as free
    /// (re-entrant acquisition refreshes them).
    pub async fn try_multi_lock(
        &self,
        keys: &[&str],
        token: &LockToken,
        ttl: Duration,
    ) -> CacheResult<bool> {
        check_lock_params("try_multi_lock", token, Some(ttl))?;
        if keys.is_empty() {
            return Err(CacheError::invalid_operation(
                "try_multi_lock: key list is empty",
            ));
        }
        let value: i64 = self
            .eval(
                scripts::MULTI_LOCK_ACQUIRE,
                keys,
                (token.as_str(), ttl_millis(ttl)),
            )
            .await?;
        decode_lock_reply("try_multi_lock", value)
    }

    /// Release every key in `keys` still held under `token`, skipping
    /// the rest. Returns the count actually released; partial release
    /// (some locks already expired) is expected and not an error.
    pub async fn release_multi_lock(
        &self,
        keys: &[&str],
        token: &LockToken,
    ) -> CacheResult<i64> {
        check_lock_params("release_multi_lock", token, None)?;
        if keys.is_empty() {
            return Err(CacheError::invalid_operation(
                "release_multi_lock: key list is empty",
            ));
        }
        self.eval(scripts::MULTI_LOCK_RELEASE, keys, token.as_str())
            .await
    }
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

// Guard before any round trip; the scripts enforce the same rules
// server-side as part of the wire contract.
fn check_lock_params(op: &str, token: &LockToken, ttl: Option<Duration>) -> CacheResult<()> {
    if token.is_empty() {
        return Err(CacheError::invalid_operation(format!(
            "{op}: lock token must not be empty"
        )));
    }
    if let Some(ttl) = ttl {
        if ttl.is_zero() {
            return Err(CacheError::invalid_operation(format!(
                "{op}: ttl must be positive"
            )));
        }
    }
    Ok(())
}

// 1 acquired/applied, 0 contended/mismatched, -1 parameter error; any
// other value means the script and the client disagree about the
// contract, which is an internal defect rather than a business outcome.
fn decode_lock_reply(op: &str, value: i64) -> CacheResult<bool> {
    match value {
        1 => Ok(true),
        0 => Ok(false),
        -1 => Err(CacheError::invalid_operation(format!(
            "{op}: store rejected the parameters"
        ))),
        other => Err(CacheError::store_internal(format!(
            "{op}: unexpected script reply {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::ErrorKind;

    #[test]
    fn lock_reply_decoding() {
        assert_eq!(decode_lock_reply("try_lock", 1).unwrap(), true);
        assert_eq!(decode_lock_reply("try_lock", 0).unwrap(), false);

        let err = decode_lock_reply("try_lock", -1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let err = decode_lock_reply("try_lock", 7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreInternal);
    }

    #[test]
    fn counter_update_decoding() {
        assert_eq!(CounterUpdate::from_wire(3), CounterUpdate::Applied(3));
        assert_eq!(CounterUpdate::from_wire(0), CounterUpdate::Applied(0));
        assert_eq!(CounterUpdate::from_wire(-1), CounterUpdate::AtCeiling);
        assert!(CounterUpdate::Applied(1).is_applied());
        assert!(!CounterUpdate::AtCeiling.is_applied());
    }

    #[test]
    fn empty_token_is_rejected_locally() {
        let empty = LockToken::new("");
        let err = check_lock_params("try_lock", &empty, Some(Duration::from_secs(1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn zero_ttl_is_rejected_locally() {
        let token = LockToken::random();
        let err = check_lock_params("renew_lock", &token, Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert!(check_lock_params("release_lock", &token, None).is_ok());
    }
}
