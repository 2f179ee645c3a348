//! Server-side script sources and the name registry.
//!
//! Each constant documents its KEYS/ARGV contract and return values; the
//! store guarantees one script evaluation is atomic against every other
//! command, which is the correctness base for the bounded counters and
//! locks built on top. The registry maps logical names to prepared
//! scripts; lookups are local and never touch the network.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use redis::Script;
use redline_core::{CacheError, CacheResult};

// Logical names for the built-in scripts.
pub const BOUNDED_INCR: &str = "bounded_incr";
pub const BOUNDED_DECR: &str = "bounded_decr";
pub const BOUNDED_HINCR: &str = "bounded_hincr";
pub const BOUNDED_HDECR: &str = "bounded_hdecr";
pub const INCR_WITH_LIMIT_AND_EXPIRE: &str = "incr_with_limit_and_expire";
pub const EXPIRE_IF_EXISTS: &str = "expire_if_exists";
pub const DEL_IF_VALUE_MATCHES: &str = "del_if_value_matches";
pub const LOCK_ACQUIRE: &str = "lock_acquire";
pub const LOCK_RELEASE: &str = "lock_release";
pub const LOCK_RENEW: &str = "lock_renew";
pub const MULTI_LOCK_ACQUIRE: &str = "multi_lock_acquire";
pub const MULTI_LOCK_RELEASE: &str = "multi_lock_release";

/// Ceiling-guarded increment.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = delta, ARGV\[2\] = ceiling
///
/// Applies the increment only while the current value (absent reads as 0)
/// is below the ceiling; otherwise returns the current value unchanged.
pub const BOUNDED_INCR_SRC: &str = r"
local cur = tonumber(redis.call('get', KEYS[1]) or 0)
local incr = tonumber(ARGV[1])
local max = tonumber(ARGV[2])
if cur < max then
    return redis.call('incrby', KEYS[1], incr)
else
    return cur
end";

/// Floor-guarded decrement.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = delta
///
/// Applies the decrement only while the current value covers it;
/// otherwise returns the current value unchanged.
pub const BOUNDED_DECR_SRC: &str = r"
local cur = tonumber(redis.call('get', KEYS[1]) or 0)
local decr = tonumber(ARGV[1])
if cur >= decr then
    return redis.call('decrby', KEYS[1], decr)
else
    return cur
end";

/// Ceiling-guarded increment of a hash field.
///
/// KEYS\[1\] = hash key, KEYS\[2\] = field
/// ARGV\[1\] = delta, ARGV\[2\] = ceiling
pub const BOUNDED_HINCR_SRC: &str = r"
local cur = tonumber(redis.call('hget', KEYS[1], KEYS[2]) or 0)
local incr = tonumber(ARGV[1])
local max = tonumber(ARGV[2])
if cur < max then
    return redis.call('hincrby', KEYS[1], KEYS[2], incr)
else
    return cur
end";

/// Floor-guarded decrement of a hash field.
///
/// KEYS\[1\] = hash key, KEYS\[2\] = field
/// ARGV\[1\] = delta
pub const BOUNDED_HDECR_SRC: &str = r"
local cur = tonumber(redis.call('hget', KEYS[1], KEYS[2]) or 0)
local decr = tonumber(ARGV[1])
if cur >= decr then
    return redis.call('hincrby', KEYS[1], KEYS[2], -decr)
else
    return cur
end";

/// Ceiling-guarded increment that refreshes the key TTL on every applied
/// increment.
///
/// KEYS\[1\] = counter key
/// ARGV\[1\] = delta, ARGV\[2\] = ceiling, ARGV\[3\] = ttl seconds
///
/// Returns the new value, or -1 once the ceiling blocks the increment.
/// The sentinel is part of the wire contract; the typed client API
/// decodes it so callers never compare against -1 themselves.
pub const INCR_WITH_LIMIT_AND_EXPIRE_SRC: &str = r"
local cur = tonumber(redis.call('get', KEYS[1]) or 0)
local incr = tonumber(ARGV[1])
local max = tonumber(ARGV[2])
local ttl = tonumber(ARGV[3])
if cur < max then
    local val = redis.call('incrby', KEYS[1], incr)
    redis.call('expire', KEYS[1], ttl)
    return val
else
    return -1
end";

/// Refresh a TTL only when the key exists.
///
/// KEYS\[1\] = key, ARGV\[1\] = ttl seconds
///
/// Returns 1 when the expiry was set, 0 when the key was absent.
pub const EXPIRE_IF_EXISTS_SRC: &str = r"
if redis.call('exists', KEYS[1]) == 1 then
    return redis.call('expire', KEYS[1], ARGV[1])
else
    return 0
end";

/// Delete a key only when it holds the expected value.
///
/// KEYS\[1\] = key, ARGV\[1\] = expected value
///
/// Returns 1 on match-and-delete, 0 otherwise.
pub const DEL_IF_VALUE_MATCHES_SRC: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    redis.call('del', KEYS[1])
    return 1
else
    return 0
end";

/// Acquire a single-key lock.
///
/// KEYS\[1\] = lock key
/// ARGV\[1\] = owner token, ARGV\[2\] = ttl milliseconds
///
/// Returns 1 when acquired, 0 when contended, -1 on invalid parameters.
pub const LOCK_ACQUIRE_SRC: &str = r"
local key = KEYS[1]
local token = ARGV[1]
local ttl = tonumber(ARGV[2])
if not key or not token or token == '' or not ttl or ttl <= 0 then
    return -1
end
if redis.call('set', key, token, 'NX', 'PX', ttl) then
    return 1
else
    return 0
end";

/// Release a single-key lock.
///
/// KEYS\[1\] = lock key, ARGV\[1\] = owner token
///
/// Deletes the key only when it still holds the token. Returns 1 on
/// release, 0 when the lock is absent or owned by someone else.
pub const LOCK_RELEASE_SRC: &str = r"
local key = KEYS[1]
local token = ARGV[1]
if not key or not token or token == '' then
    return 0
end
if redis.call('get', key) == token then
    redis.call('del', key)
    return 1
else
    return 0
end";

/// Renew a single-key lock.
///
/// KEYS\[1\] = lock key
/// ARGV\[1\] = owner token, ARGV\[2\] = new ttl milliseconds
///
/// Refreshes the expiry only on token match. Returns 1 on renewal, 0 on
/// mismatch or absence, -1 on invalid parameters.
pub const LOCK_RENEW_SRC: &str = r"
local key = KEYS[1]
local token = ARGV[1]
local ttl = tonumber(ARGV[2])
if not key or not token or token == '' or not ttl or ttl <= 0 then
    return -1
end
if redis.call('get', key) == token then
    redis.call('pexpire', key, ttl)
    return 1
else
    return 0
end";

/// Acquire a set of locks all-or-nothing.
///
/// KEYS = lock keys
/// ARGV\[1\] = owner token, ARGV\[2\] = ttl milliseconds
///
/// First pass only reads: any key held by a different token fails the
/// whole call with no side effects. The second pass sets every key. Both
/// passes run inside one atomic evaluation, so no other client can
/// interleave between check and set. Returns 1/0/-1.
pub const MULTI_LOCK_ACQUIRE_SRC: &str = r"
local token = ARGV[1]
local ttl = tonumber(ARGV[2])
if not token or token == '' or not ttl or ttl <= 0 or #KEYS == 0 then
    return -1
end
for i, key in ipairs(KEYS) do
    local current = redis.call('get', key)
    if current and current ~= token then
        return 0
    end
end
for i, key in ipairs(KEYS) do
    redis.call('set', key, token, 'PX', ttl)
end
return 1";

/// Release a set of locks.
///
/// KEYS = lock keys, ARGV\[1\] = owner token
///
/// Deletes every key still holding the token, skipping the rest, and
/// returns the count actually released. Partial release (expired or
/// re-acquired keys) is expected and not an error.
pub const MULTI_LOCK_RELEASE_SRC: &str = r"
local token = ARGV[1]
local released = 0
if not token or token == '' or #KEYS == 0 then
    return 0
end
for i, key in ipairs(KEYS) do
    if redis.call('get', key) == token then
        redis.call('del', key)
        released = released + 1
    end
end
return released";

/// Number of KEYS a registered script expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyArity {
    Exact(usize),
    AtLeast(usize),
}

impl KeyArity {
    fn accepts(&self, count: usize) -> bool {
        match self {
            KeyArity::Exact(n) => count == *n,
            KeyArity::AtLeast(n) => count >= *n,
        }
    }
}

/// One registered script: the prepared source plus its key arity.
#[derive(Clone, Debug)]
pub struct ScriptEntry {
    script: Arc<Script>,
    key_arity: KeyArity,
}

impl ScriptEntry {
    pub fn new(source: &str, key_arity: KeyArity) -> Self {
        Self {
            script: Arc::new(Script::new(source)),
            key_arity,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Reject a key list that cannot match the script before any network
    /// round trip happens.
    pub fn check_keys(&self, name: &str, count: usize) -> CacheResult<()> {
        if !self.key_arity.accepts(count) {
            let expected = match self.key_arity {
                KeyArity::Exact(n) => format!("exactly {n}"),
                KeyArity::AtLeast(n) => format!("at least {n}"),
            };
            return Err(CacheError::invalid_operation(format!(
                "script '{name}' expects {expected} key(s), got {count}"
            )));
        }
        Ok(())
    }
}

/// Concurrent name-to-script mapping.
///
/// Registration may happen before or after any session exists; the
/// registry itself never dials. Re-registering a name replaces its entry.
#[derive(Default)]
pub struct ScriptRegistry {
    entries: RwLock<HashMap<String, ScriptEntry>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in script.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(BOUNDED_INCR, BOUNDED_INCR_SRC, KeyArity::Exact(1));
        registry.register(BOUNDED_DECR, BOUNDED_DECR_SRC, KeyArity::Exact(1));
        registry.register(BOUNDED_HINCR, BOUNDED_HINCR_SRC, KeyArity::Exact(2));
        registry.register(BOUNDED_HDECR, BOUNDED_HDECR_SRC, KeyArity::Exact(2));
        registry.register(
            INCR_WITH_LIMIT_AND_EXPIRE,
            INCR_WITH_LIMIT_AND_EXPIRE_SRC,
            KeyArity::Exact(1),
        );
        registry.register(EXPIRE_IF_EXISTS, EXPIRE_IF_EXISTS_SRC, KeyArity::Exact(1));
        registry.register(
            DEL_IF_VALUE_MATCHES,
            DEL_IF_VALUE_MATCHES_SRC,
            KeyArity::Exact(1),
        );
        registry.register(LOCK_ACQUIRE, LOCK_ACQUIRE_SRC, KeyArity::Exact(1));
        registry.register(LOCK_RELEASE, LOCK_RELEASE_SRC, KeyArity::Exact(1));
        registry.register(LOCK_RENEW, LOCK_RENEW_SRC, KeyArity::Exact(1));
        registry.register(
            MULTI_LOCK_ACQUIRE,
            MULTI_LOCK_ACQUIRE_SRC,
            KeyArity::AtLeast(1),
        );
        registry.register(
            MULTI_LOCK_RELEASE,
            MULTI_LOCK_RELEASE_SRC,
            KeyArity::AtLeast(1),
        );
        registry
    }

    pub fn register(&self, name: &str, source: &str, key_arity: KeyArity) {
        let mut entries = self.entries.write().expect("script registry lock poisoned");
        entries.insert(name.to_string(), ScriptEntry::new(source, key_arity));
    }

    /// Clone the entry for a name. `INVALID_OPERATION` when unregistered;
    /// never a network round trip.
    pub fn entry(&self, name: &str) -> CacheResult<ScriptEntry> {
        let entries = self.entries.read().expect("script registry lock poisoned");
        entries.get(name).cloned().ok_or_else(|| {
            CacheError::invalid_operation(format!("script '{name}' is not registered"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .expect("script registry lock poisoned")
            .contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().expect("script registry lock poisoned");
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::ErrorKind;

    #[test]
    fn builtins_are_registered() {
        let registry = ScriptRegistry::with_builtins();
        for name in [
            BOUNDED_INCR,
            BOUNDED_DECR,
            BOUNDED_HINCR,
            BOUNDED_HDECR,
            INCR_WITH_LIMIT_AND_EXPIRE,
            EXPIRE_IF_EXISTS,
            DEL_IF_VALUE_MATCHES,
            LOCK_ACQUIRE,
            LOCK_RELEASE,
            LOCK_RENEW,
            MULTI_LOCK_ACQUIRE,
            MULTI_LOCK_RELEASE,
        ] {
            assert!(registry.contains(name), "missing builtin: {name}");
        }
    }

    #[test]
    fn unknown_name_is_a_local_invalid_operation() {
        let registry = ScriptRegistry::with_builtins();
        let err = registry.entry("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn registration_replaces_existing_entry() {
        let registry = ScriptRegistry::new();
        registry.register("custom", "return 1", KeyArity::Exact(0));
        let first = registry.entry("custom").unwrap().script().get_hash().to_string();
        registry.register("custom", "return 2", KeyArity::Exact(0));
        let second = registry.entry("custom").unwrap().script().get_hash().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn arity_check_rejects_wrong_key_counts() {
        let entry = ScriptEntry::new(LOCK_ACQUIRE_SRC, KeyArity::Exact(1));
        assert!(entry.check_keys("lock_acquire", 1).is_ok());
        assert!(entry.check_keys("lock_acquire", 0).is_err());
        assert!(entry.check_keys("lock_acquire", 2).is_err());

        let entry = ScriptEntry::new(MULTI_LOCK_ACQUIRE_SRC, KeyArity::AtLeast(1));
        assert!(entry.check_keys("multi_lock_acquire", 3).is_ok());
        assert!(entry.check_keys("multi_lock_acquire", 0).is_err());
    }

    #[test]
    fn counter_scripts_guard_their_bounds() {
        assert!(BOUNDED_INCR_SRC.contains("cur < max"));
        assert!(BOUNDED_DECR_SRC.contains("cur >= decr"));
        assert!(INCR_WITH_LIMIT_AND_EXPIRE_SRC.contains("return -1"));
        assert!(INCR_WITH_LIMIT_AND_EXPIRE_SRC.contains("expire"));
    }

    #[test]
    fn multi_lock_checks_before_setting() {
        let check_pos = MULTI_LOCK_ACQUIRE_SRC
            .find("current ~= token")
            .expect("read-only check phase");
        let set_pos = MULTI_LOCK_ACQUIRE_SRC
            .find("'set', key")
            .expect("set phase");
        assert!(check_pos < set_pos);
    }

    #[test]
    fn names_are_sorted_and_complete() {
        let registry = ScriptRegistry::with_builtins();
        let names = registry.names();
        assert_eq!(names.len(), 12);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
