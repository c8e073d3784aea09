// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store.
//!
//! Backs tests and the presence-store-disabled configuration. Expiry is
//! driven by the injected [`Clock`], so TTL behavior is testable with a
//! `FakeClock`. Every operation takes one lock; batches are therefore
//! always atomic, which satisfies (exceeds) the trait contract.

use crate::store::{Score, Store, StoreOp, StoreResult};
use async_trait::async_trait;
use hearth_core::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const SUBSCRIBER_BUFFER: usize = 64;

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    zsets: HashMap<String, HashMap<String, Score>>,
    /// Per-key expiry across all namespaces.
    expiry: HashMap<String, Instant>,
    subs: HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>,
}

impl Inner {
    fn drop_key(&mut self, key: &str) {
        self.strings.remove(key);
        self.hashes.remove(key);
        self.zsets.remove(key);
        self.expiry.remove(key);
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.drop_key(&key);
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.strings.contains_key(key)
            || self.hashes.contains_key(key)
            || self.zsets.contains_key(key)
    }

    fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.strings.keys().cloned().collect();
        keys.extend(self.hashes.keys().cloned());
        keys.extend(self.zsets.keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    fn apply(&mut self, op: StoreOp, now: Instant) {
        match op {
            StoreOp::Set { key, value, ttl } => {
                self.strings.insert(key.clone(), value);
                match ttl {
                    Some(ttl) => {
                        self.expiry.insert(key, now + ttl);
                    }
                    None => {
                        self.expiry.remove(&key);
                    }
                }
            }
            StoreOp::Del { key } => self.drop_key(&key),
            StoreOp::HSet { key, field, value } => {
                self.hashes.entry(key).or_default().insert(field, value);
            }
            StoreOp::HDel { key, field } => {
                let now_empty = match self.hashes.get_mut(&key) {
                    Some(hash) => {
                        hash.remove(&field);
                        hash.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.drop_key(&key);
                }
            }
            StoreOp::ZAdd { key, member, score } => {
                self.zsets.entry(key).or_default().insert(member, score);
            }
            StoreOp::ZRem { key, member } => {
                let now_empty = match self.zsets.get_mut(&key) {
                    Some(zset) => {
                        zset.remove(&member);
                        zset.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.drop_key(&key);
                }
            }
            StoreOp::Expire { key, ttl } => {
                if self.exists(&key) {
                    self.expiry.insert(key, now + ttl);
                }
            }
        }
    }
}

/// In-memory [`Store`] implementation.
#[derive(Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    /// Members sorted ascending by (score, member), redis-style.
    fn sorted_members(zset: &HashMap<String, Score>) -> Vec<(String, Score)> {
        let mut members: Vec<(String, Score)> =
            zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        members
    }
}

/// Match a redis-style glob pattern supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    fn matches(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                matches(&p[1..], t) || (!t.is_empty() && matches(p, &t[1..]))
            }
            (Some('?'), Some(_)) => matches(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc == tc => matches(&p[1..], &t[1..]),
            _ => false,
        }
    }

    matches(&p, &t)
}

#[async_trait]
impl<C: Clock> Store for MemoryStore<C> {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        inner.apply(
            StoreOp::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
            },
            now,
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        Ok(inner.strings.get(key).cloned())
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        Ok(keys.iter().map(|k| inner.strings.get(k).cloned()).collect())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.drop_key(key);
        Ok(())
    }

    async fn del_matching(&self, pattern: &str) -> StoreResult<u64> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let matching: Vec<String> = inner
            .all_keys()
            .into_iter()
            .filter(|k| glob_match(pattern, k))
            .collect();
        let count = matching.len() as u64;
        for key in matching {
            inner.drop_key(&key);
        }
        Ok(count)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        inner.apply(
            StoreOp::HSet {
                key: key.to_string(),
                field: field.to_string(),
                value: value.to_string(),
            },
            now,
        );
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        Ok(inner.hashes.get(key).and_then(|h| h.get(field).cloned()))
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let hash = inner.hashes.get(key);
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f).cloned()))
            .collect())
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.apply(
            StoreOp::HDel {
                key: key.to_string(),
                field: field.to_string(),
            },
            now,
        );
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let mut pairs: Vec<(String, String)> = inner
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default();
        pairs.sort();
        Ok(pairs)
    }

    async fn zadd(&self, key: &str, member: &str, score: Score) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        inner.apply(
            StoreOp::ZAdd {
                key: key.to_string(),
                member: member.to_string(),
                score,
            },
            now,
        );
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.apply(
            StoreOp::ZRem {
                key: key.to_string(),
                member: member.to_string(),
            },
            now,
        );
        Ok(())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        Ok(inner.zsets.get(key).map(|z| z.len() as u64).unwrap_or(0))
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<Score>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        Ok(inner.zsets.get(key).and_then(|z| z.get(member).copied()))
    }

    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(None);
        };
        if !zset.contains_key(member) {
            return Ok(None);
        }
        let sorted = Self::sorted_members(zset);
        Ok(sorted
            .iter()
            .rev()
            .position(|(m, _)| m == member)
            .map(|p| p as u64))
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, Score)>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let mut sorted = Self::sorted_members(zset);
        sorted.reverse();

        let len = sorted.len() as i64;
        let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
        let start = norm(start).min(len);
        let stop = (norm(stop) + 1).min(len);
        if start >= stop {
            return Ok(Vec::new());
        }
        Ok(sorted[start as usize..stop as usize].to_vec())
    }

    async fn zrangebyscore_gt(
        &self,
        key: &str,
        min: Score,
    ) -> StoreResult<Vec<(String, Score)>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(Self::sorted_members(zset)
            .into_iter()
            .filter(|(_, s)| *s > min)
            .collect())
    }

    async fn zremrangebyscore_lte(&self, key: &str, max: Score) -> StoreResult<u64> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        let (count, now_empty) = match inner.zsets.get_mut(key) {
            None => return Ok(0),
            Some(zset) => {
                let doomed: Vec<String> = zset
                    .iter()
                    .filter(|(_, s)| **s <= max)
                    .map(|(m, _)| m.clone())
                    .collect();
                let count = doomed.len() as u64;
                for member in doomed {
                    zset.remove(&member);
                }
                (count, zset.is_empty())
            }
        };
        if now_empty {
            inner.drop_key(key);
        }
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        inner.apply(
            StoreOp::Expire {
                key: key.to_string(),
                ttl,
            },
            now,
        );
        Ok(())
    }

    async fn exec_batch(&self, ops: Vec<StoreOp>, _atomic: bool) -> StoreResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.purge_expired(now);
        for op in ops {
            inner.apply(op, now);
        }
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if let Some(senders) = inner.subs.get_mut(channel) {
            senders.retain(|tx| !tx.is_closed());
            for tx in senders.iter() {
                // Slow subscribers drop messages rather than block publish
                let _ = tx.try_send(payload.clone());
            }
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<mpsc::Receiver<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        inner.subs.entry(channel.to_string()).or_default().push(tx);
        Ok(rx)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
