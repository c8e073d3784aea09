// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hearth_core::FakeClock;
use yare::parameterized;

#[tokio::test]
async fn string_set_get_del() {
    let store = MemoryStore::new();
    store.set("k", "v", None).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

    store.del("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn string_ttl_expires_with_clock() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());

    store
        .set("k", "v", Some(Duration::from_secs(30)))
        .await
        .unwrap();
    assert!(store.get("k").await.unwrap().is_some());

    clock.advance(Duration::from_secs(29));
    assert!(store.get("k").await.unwrap().is_some());

    clock.advance(Duration::from_secs(2));
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn expire_refreshes_ttl() {
    let clock = FakeClock::new();
    let store = MemoryStore::with_clock(clock.clone());

    store
        .set("k", "v", Some(Duration::from_secs(10)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(8));
    store.expire("k", Duration::from_secs(10)).await.unwrap();
    clock.advance(Duration::from_secs(8));
    assert!(store.get("k").await.unwrap().is_some(), "ttl was refreshed");

    // Expire on a missing key is a no-op
    store.expire("missing", Duration::from_secs(10)).await.unwrap();
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn mget_preserves_order_and_gaps() {
    let store = MemoryStore::new();
    store.set("a", "1", None).await.unwrap();
    store.set("c", "3", None).await.unwrap();

    let got = store
        .mget(&["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();
    assert_eq!(got, vec![Some("1".into()), None, Some("3".into())]);
}

#[tokio::test]
async fn hash_operations() {
    let store = MemoryStore::new();
    store.hset("h", "f1", "v1").await.unwrap();
    store.hset("h", "f2", "v2").await.unwrap();

    assert_eq!(store.hget("h", "f1").await.unwrap().as_deref(), Some("v1"));
    assert_eq!(
        store
            .hmget("h", &["f2".into(), "missing".into()])
            .await
            .unwrap(),
        vec![Some("v2".into()), None]
    );
    assert_eq!(
        store.hgetall("h").await.unwrap(),
        vec![("f1".into(), "v1".into()), ("f2".into(), "v2".into())]
    );

    store.hdel("h", "f1").await.unwrap();
    assert_eq!(store.hget("h", "f1").await.unwrap(), None);
}

#[tokio::test]
async fn zset_rev_range_and_rank() {
    let store = MemoryStore::new();
    store.zadd("z", "carol", 900.0).await.unwrap();
    store.zadd("z", "alice", 1200.0).await.unwrap();
    store.zadd("z", "bob", 1000.0).await.unwrap();

    let top = store.zrevrange_with_scores("z", 0, 1).await.unwrap();
    assert_eq!(
        top,
        vec![("alice".into(), 1200.0), ("bob".into(), 1000.0)]
    );

    assert_eq!(store.zrevrank("z", "alice").await.unwrap(), Some(0));
    assert_eq!(store.zrevrank("z", "carol").await.unwrap(), Some(2));
    assert_eq!(store.zrevrank("z", "nobody").await.unwrap(), None);
    assert_eq!(store.zcard("z").await.unwrap(), 3);
    assert_eq!(store.zscore("z", "bob").await.unwrap(), Some(1000.0));
}

#[parameterized(
    full = { 0, -1, 3 },
    first_two = { 0, 1, 2 },
    tail_negative = { -2, -1, 2 },
    out_of_range = { 5, 9, 0 },
    inverted = { 2, 1, 0 },
)]
fn zrevrange_index_math(start: i64, stop: i64, expected_len: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let store = MemoryStore::new();
        store.zadd("z", "a", 3.0).await.unwrap();
        store.zadd("z", "b", 2.0).await.unwrap();
        store.zadd("z", "c", 1.0).await.unwrap();

        let got = store.zrevrange_with_scores("z", start, stop).await.unwrap();
        assert_eq!(got.len(), expected_len);
    });
}

#[tokio::test]
async fn zset_score_filters() {
    let store = MemoryStore::new();
    store.zadd("seen", "a", 100.0).await.unwrap();
    store.zadd("seen", "b", 200.0).await.unwrap();
    store.zadd("seen", "c", 300.0).await.unwrap();

    // Strictly-greater-than boundary
    let fresh = store.zrangebyscore_gt("seen", 200.0).await.unwrap();
    assert_eq!(fresh, vec![("c".into(), 300.0)]);

    let removed = store.zremrangebyscore_lte("seen", 200.0).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.zcard("seen").await.unwrap(), 1);
}

#[tokio::test]
async fn del_matching_globs() {
    let store = MemoryStore::new();
    store.set("xp:all", "1", None).await.unwrap();
    store.set("xp:cohort-24", "2", None).await.unwrap();
    store.hset("info:all", "f", "v").await.unwrap();
    store.set("meta:all", "3", None).await.unwrap();

    let removed = store.del_matching("xp:*").await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.get("xp:all").await.unwrap(), None);
    assert!(store.get("meta:all").await.unwrap().is_some());
}

#[parameterized(
    star_all = { "*", "anything", true },
    prefix = { "xp:*", "xp:all", true },
    prefix_miss = { "xp:*", "info:all", false },
    middle = { "online:*:task", "online:42:task", true },
    question = { "k?", "kx", true },
    question_miss = { "k?", "k", false },
    exact = { "meta:all", "meta:all", true },
    empty_pattern = { "", "x", false },
)]
fn glob_cases(pattern: &str, text: &str, expected: bool) {
    assert_eq!(glob_match(pattern, text), expected);
}

#[tokio::test]
async fn batch_applies_in_order() {
    let store = MemoryStore::new();
    store
        .exec_batch(
            vec![
                StoreOp::ZAdd {
                    key: "z".into(),
                    member: "a".into(),
                    score: 1.0,
                },
                StoreOp::HSet {
                    key: "h".into(),
                    field: "a".into(),
                    value: "v".into(),
                },
                StoreOp::ZRem {
                    key: "z".into(),
                    member: "a".into(),
                },
            ],
            true,
        )
        .await
        .unwrap();

    assert_eq!(store.zcard("z").await.unwrap(), 0);
    assert_eq!(store.hget("h", "a").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn pubsub_delivers_to_subscribers() {
    let store = MemoryStore::new();
    let mut rx = store.subscribe("events").await.unwrap();

    store.publish("events", b"hello".to_vec()).await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), b"hello".to_vec());

    // A second subscriber sees later messages
    let mut rx2 = store.subscribe("events").await.unwrap();
    store.publish("events", b"again".to_vec()).await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), b"again".to_vec());
    assert_eq!(rx2.recv().await.unwrap(), b"again".to_vec());
}

#[tokio::test]
async fn pubsub_dropped_receiver_is_pruned() {
    let store = MemoryStore::new();
    let rx = store.subscribe("events").await.unwrap();
    drop(rx);

    // Publishing to a channel with only dead receivers must not error
    store.publish("events", b"x".to_vec()).await.unwrap();
}
