//! End-to-end scenarios against a live store.
//!
//! Run with `cargo test --features integration` and a reachable Redis
//! (`REDIS_URL` overrides the default of redis://127.0.0.1:6379). Every
//! test namespaces its keys with a fresh UUID so runs never collide.

#![cfg(feature = "integration")]

use std::time::Duration;

use redline_redis::{CounterUpdate, LockToken, RedisConfig, RedisManager};

fn store_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn manager() -> RedisManager {
    RedisManager::connect(RedisConfig::standalone(store_url()))
        .await
        .expect("store should be reachable for integration tests")
}

fn unique_key(suffix: &str) -> String {
    format!("redline-test:{}:{}", uuid::Uuid::new_v4(), suffix)
}

#[tokio::test]
async fn bounded_incr_stops_at_ceiling() {
    let manager = manager().await;
    let key = unique_key("counter");

    assert_eq!(manager.safe_incr(&key, 1, 3).await.unwrap(), 1);
    assert_eq!(manager.safe_incr(&key, 1, 3).await.unwrap(), 2);
    assert_eq!(manager.safe_incr(&key, 1, 3).await.unwrap(), 3);
    // Fourth call is a successful no-op at the ceiling.
    assert_eq!(manager.safe_incr(&key, 1, 3).await.unwrap(), 3);

    manager.del(&[&key]).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn bounded_decr_stops_at_floor() {
    let manager = manager().await;
    let key = unique_key("counter");

    manager.safe_incr(&key, 5, 100).await.unwrap();
    assert_eq!(manager.safe_decr(&key, 3).await.unwrap(), 2);
    // Cannot go below zero; value is returned unchanged.
    assert_eq!(manager.safe_decr(&key, 3).await.unwrap(), 2);

    manager.del(&[&key]).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn hash_field_counters_honor_bounds() {
    let manager = manager().await;
    let key = unique_key("hash");

    assert_eq!(manager.safe_hincr(&key, "slots", 2, 4).await.unwrap(), 2);
    assert_eq!(manager.safe_hincr(&key, "slots", 2, 4).await.unwrap(), 4);
    assert_eq!(manager.safe_hincr(&key, "slots", 2, 4).await.unwrap(), 4);
    assert_eq!(manager.safe_hdecr(&key, "slots", 3).await.unwrap(), 1);
    assert_eq!(manager.safe_hdecr(&key, "slots", 3).await.unwrap(), 1);

    manager.del(&[&key]).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn ttl_refreshing_incr_signals_ceiling() {
    let manager = manager().await;
    let key = unique_key("limited");
    let ttl = Duration::from_secs(60);

    assert_eq!(
        manager
            .incr_with_limit_and_expire(&key, 1, 2, ttl)
            .await
            .unwrap(),
        CounterUpdate::Applied(1)
    );
    assert_eq!(
        manager
            .incr_with_limit_and_expire(&key, 1, 2, ttl)
            .await
            .unwrap(),
        CounterUpdate::Applied(2)
    );
    assert_eq!(
        manager
            .incr_with_limit_and_expire(&key, 1, 2, ttl)
            .await
            .unwrap(),
        CounterUpdate::AtCeiling
    );
    // TTL was set by the applied increments.
    assert!(manager.ttl(&key).await.unwrap() > 0);

    manager.del(&[&key]).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn lock_contention_and_handover() {
    let manager = manager().await;
    let key = unique_key("lock");
    let first = LockToken::new("t1");
    let second = LockToken::new("t2");
    let ttl = Duration::from_secs(1);

    assert!(manager.try_lock(&key, &first, ttl).await.unwrap());
    assert!(!manager.try_lock(&key, &second, ttl).await.unwrap());
    assert!(manager.release_lock(&key, &first).await.unwrap());
    assert!(manager.try_lock(&key, &second, ttl).await.unwrap());

    manager.release_lock(&key, &second).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn stale_holder_cannot_release_or_renew() {
    let manager = manager().await;
    let key = unique_key("lock");
    let stale = LockToken::new("stale");
    let fresh = LockToken::new("fresh");

    assert!(
        manager
            .try_lock(&key, &stale, Duration::from_millis(120))
            .await
            .unwrap()
    );
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(
        manager
            .try_lock(&key, &fresh, Duration::from_secs(5))
            .await
            .unwrap()
    );

    // The expired holder must not touch the new holder's lock.
    assert!(!manager.release_lock(&key, &stale).await.unwrap());
    assert!(
        !manager
            .renew_lock(&key, &stale, Duration::from_secs(5))
            .await
            .unwrap()
    );
    assert_eq!(manager.get(&key).await.unwrap().as_deref(), Some("fresh"));

    manager.release_lock(&key, &fresh).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn renew_extends_a_held_lock() {
    let manager = manager().await;
    let key = unique_key("lock");
    let token = LockToken::random();

    assert!(
        manager
            .try_lock(&key, &token, Duration::from_millis(300))
            .await
            .unwrap()
    );
    assert!(
        manager
            .renew_lock(&key, &token, Duration::from_secs(10))
            .await
            .unwrap()
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    // Still held thanks to the renewal.
    assert!(manager.release_lock(&key, &token).await.unwrap());

    manager.shutdown().await;
}

#[tokio::test]
async fn multi_lock_is_all_or_nothing() {
    let manager = manager().await;
    let a = unique_key("a");
    let b = unique_key("b");
    let c = unique_key("c");
    let first = LockToken::new("t1");
    let second = LockToken::new("t2");
    let ttl = Duration::from_millis(800);

    assert!(
        manager
            .try_multi_lock(&[&a, &b], &first, ttl)
            .await
            .unwrap()
    );
    // B is contended, so the whole attempt fails with no side effects.
    assert!(
        !manager
            .try_multi_lock(&[&b, &c], &second, ttl)
            .await
            .unwrap()
    );
    assert_eq!(manager.get(&a).await.unwrap().as_deref(), Some("t1"));
    assert_eq!(manager.get(&b).await.unwrap().as_deref(), Some("t1"));
    assert_eq!(manager.get(&c).await.unwrap(), None);

    assert_eq!(
        manager.release_multi_lock(&[&a, &b], &first).await.unwrap(),
        2
    );
    manager.shutdown().await;
}

#[tokio::test]
async fn multi_release_counts_only_held_keys() {
    let manager = manager().await;
    let a = unique_key("a");
    let b = unique_key("b");
    let token = LockToken::random();

    assert!(
        manager
            .try_multi_lock(&[&a, &b], &token, Duration::from_secs(5))
            .await
            .unwrap()
    );
    manager.del(&[&a]).await.unwrap();
    // Only b is still held; partial release is a success.
    assert_eq!(
        manager.release_multi_lock(&[&a, &b], &token).await.unwrap(),
        1
    );
    manager.shutdown().await;
}

#[tokio::test]
async fn conditional_expire_and_delete() {
    let manager = manager().await;
    let key = unique_key("guarded");

    assert!(
        !manager
            .set_expire_if_exists(&key, Duration::from_secs(30))
            .await
            .unwrap()
    );
    manager.set(&key, "v1").await.unwrap();
    assert!(
        manager
            .set_expire_if_exists(&key, Duration::from_secs(30))
            .await
            .unwrap()
    );
    assert!(!manager.delete_if_value_matches(&key, "other").await.unwrap());
    assert!(manager.delete_if_value_matches(&key, "v1").await.unwrap());
    assert_eq!(manager.get(&key).await.unwrap(), None);

    manager.shutdown().await;
}

#[tokio::test]
async fn passthrough_and_batch_roundtrip() {
    let manager = manager().await;
    let key = unique_key("kv");
    let list = unique_key("list");

    manager.set(&key, "hello").await.unwrap();
    assert_eq!(manager.get(&key).await.unwrap().as_deref(), Some("hello"));
    assert_eq!(
        manager.get_bytes(&key).await.unwrap().as_deref(),
        Some(b"hello".as_slice())
    );

    manager.rpush(&list, &["x", "y"]).await.unwrap();
    assert_eq!(manager.llen(&list).await.unwrap(), 2);

    let mut batch = redline_redis::CommandBatch::new();
    batch
        .atomic()
        .incr_by(&key2(&key), 5)
        .incr_by(&key2(&key), 5);
    let replies = manager.exec_batch(&batch).await.unwrap();
    assert_eq!(replies.len(), 2);

    manager.del(&[&key, &key2(&key), &list]).await.unwrap();
    manager.shutdown().await;
}

fn key2(base: &str) -> String {
    format!("{base}:n")
}

#[tokio::test]
async fn custom_scripts_register_and_run() {
    let manager = manager().await;

    manager.register_script(
        "sum",
        "return tonumber(ARGV[1]) + tonumber(ARGV[2])",
        redline_redis::KeyArity::Exact(0),
    );
    let sum: i64 = manager.eval("sum", &[] as &[&str], (20i64, 22i64)).await.unwrap();
    assert_eq!(sum, 42);

    // Unregistered names fail locally.
    let err = manager
        .eval::<i64, &str, i64>("missing", &[], 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), redline_redis::ErrorKind::InvalidOperation);

    manager.shutdown().await;
}

#[tokio::test]
async fn stats_count_operations() {
    let manager = manager().await;
    let key = unique_key("stats");

    let before = manager.stats().total_ops;
    manager.set(&key, 1).await.unwrap();
    manager.get(&key).await.unwrap();
    let after = manager.stats().total_ops;
    assert!(after >= before + 2);

    manager.del(&[&key]).await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let manager = manager().await;
    manager.shutdown().await;
    manager.shutdown().await;
}
