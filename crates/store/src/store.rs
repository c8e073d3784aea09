// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store capability trait.
//!
//! Deliberately narrow: exactly the command set the leaderboard cache and
//! presence tracker use, plus a batch form for pipelined and transactional
//! mutations. Scores are f64 to match the ordered-set substrate; callers
//! that store XP or unix seconds cast at the edge.

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered-set score.
pub type Score = f64;

/// One mutation inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    Del {
        key: String,
    },
    HSet {
        key: String,
        field: String,
        value: String,
    },
    HDel {
        key: String,
        field: String,
    },
    ZAdd {
        key: String,
        member: String,
        score: Score,
    },
    ZRem {
        key: String,
        member: String,
    },
    Expire {
        key: String,
        ttl: Duration,
    },
}

/// Capability set over the hot store.
///
/// All operations are idempotent. Implementations are responsible for
/// their own atomicity guarantees: `exec_batch(_, true)` must apply all
/// ops or none, and must not interleave with other writers.
#[async_trait]
pub trait Store: Send + Sync {
    // -- strings --

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;
    async fn del(&self, key: &str) -> StoreResult<()>;

    /// Delete all keys matching a glob pattern (`*` and `?`). Returns the
    /// number of keys removed.
    async fn del_matching(&self, pattern: &str) -> StoreResult<u64>;

    // -- hashes --

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    async fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>>;
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()>;
    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>>;

    // -- ordered sets --

    async fn zadd(&self, key: &str, member: &str, score: Score) -> StoreResult<()>;
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()>;
    async fn zcard(&self, key: &str) -> StoreResult<u64>;
    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<Score>>;

    /// 0-based rank in descending score order, `None` if absent.
    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>>;

    /// Members with scores, descending, over the 0-based inclusive index
    /// range `[start, stop]` (like ZREVRANGE).
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, Score)>>;

    /// Members with score strictly greater than `min`, ascending.
    async fn zrangebyscore_gt(&self, key: &str, min: Score)
        -> StoreResult<Vec<(String, Score)>>;

    /// Remove members with score less than or equal to `max`. Returns the
    /// number removed.
    async fn zremrangebyscore_lte(&self, key: &str, max: Score) -> StoreResult<u64>;

    // -- ttl --

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    // -- batches --

    /// Apply ops in order. With `atomic` the batch is a transaction
    /// (all-or-nothing, no interleaving); without it a plain pipeline.
    async fn exec_batch(&self, ops: Vec<StoreOp>, atomic: bool) -> StoreResult<()>;

    // -- pub/sub --

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> StoreResult<()>;

    /// Subscribe to a channel. Messages published after this call arrive
    /// on the receiver; the subscription ends when the receiver drops.
    async fn subscribe(&self, channel: &str) -> StoreResult<mpsc::Receiver<Vec<u8>>>;

    /// Liveness probe.
    async fn ping(&self) -> StoreResult<()>;
}
