// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed store.
//!
//! Commands go through a [`ConnectionManager`] (auto-reconnecting,
//! cloneable); each pub/sub subscription gets its own dedicated
//! connection with a forwarding task, since a subscribed Redis connection
//! cannot issue regular commands.

use crate::error::StoreError;
use crate::store::{Score, Store, StoreOp, StoreResult};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const SUBSCRIBER_BUFFER: usize = 64;

/// Redis [`Store`] implementation.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    client: redis::Client,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let manager = ConnectionManager::new(client.clone()).await?;
        debug!(url, "connected to redis");
        Ok(Self { manager, client })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Seconds for EXPIRE/SETEX; zero-length TTLs round up to one second.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    fn push_op(pipe: &mut redis::Pipeline, op: StoreOp) {
        match op {
            StoreOp::Set { key, value, ttl } => match ttl {
                Some(ttl) => {
                    pipe.cmd("SETEX")
                        .arg(key)
                        .arg(Self::ttl_secs(ttl))
                        .arg(value)
                        .ignore();
                }
                None => {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
            },
            StoreOp::Del { key } => {
                pipe.cmd("DEL").arg(key).ignore();
            }
            StoreOp::HSet { key, field, value } => {
                pipe.cmd("HSET").arg(key).arg(field).arg(value).ignore();
            }
            StoreOp::HDel { key, field } => {
                pipe.cmd("HDEL").arg(key).arg(field).ignore();
            }
            StoreOp::ZAdd { key, member, score } => {
                pipe.cmd("ZADD").arg(key).arg(score).arg(member).ignore();
            }
            StoreOp::ZRem { key, member } => {
                pipe.cmd("ZREM").arg(key).arg(member).ignore();
            }
            StoreOp::Expire { key, ttl } => {
                pipe.cmd("EXPIRE").arg(key).arg(Self::ttl_secs(ttl)).ignore();
            }
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, Self::ttl_secs(ttl)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.get(key).await?)
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn();
        // MGET with a single key folds to a scalar reply; keep the shape
        if keys.len() == 1 {
            let one: Option<String> = conn.get(&keys[0]).await?;
            return Ok(vec![one]);
        }
        Ok(conn.mget(keys).await?)
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn del_matching(&self, pattern: &str) -> StoreResult<u64> {
        let mut conn = self.conn();
        let keys: Vec<String> = conn.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let count = keys.len() as u64;
        conn.del::<_, ()>(keys).await?;
        Ok(count)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.hget(key, field).await?)
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn();
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(field);
        }
        Ok(cmd.query_async(&mut conn).await?)
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.hdel::<_, _, ()>(key, field).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.conn();
        Ok(conn.hgetall(key).await?)
    }

    async fn zadd(&self, key: &str, member: &str, score: Score) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.zrem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn();
        Ok(conn.zcard(key).await?)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<Score>> {
        let mut conn = self.conn();
        Ok(conn.zscore(key, member).await?)
    }

    async fn zrevrank(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.conn();
        Ok(conn.zrevrank(key, member).await?)
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, Score)>> {
        let mut conn = self.conn();
        Ok(conn.zrevrange_withscores(key, start as isize, stop as isize).await?)
    }

    async fn zrangebyscore_gt(
        &self,
        key: &str,
        min: Score,
    ) -> StoreResult<Vec<(String, Score)>> {
        let mut conn = self.conn();
        Ok(conn
            .zrangebyscore_withscores(key, format!("({min}"), "+inf")
            .await?)
    }

    async fn zremrangebyscore_lte(&self, key: &str, max: Score) -> StoreResult<u64> {
        let mut conn = self.conn();
        Ok(conn.zrembyscore(key, "-inf", max).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.expire::<_, ()>(key, Self::ttl_secs(ttl) as i64).await?;
        Ok(())
    }

    async fn exec_batch(&self, ops: Vec<StoreOp>, atomic: bool) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        if atomic {
            pipe.atomic();
        }
        for op in ops {
            Self::push_op(&mut pipe, op);
        }
        let mut conn = self.conn();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> StoreResult<mpsc::Receiver<Vec<u8>>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(StoreError::from)?;
        pubsub.subscribe(channel).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let channel = channel.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(%channel, error = %err, "undecodable pub/sub payload");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    // Receiver dropped; end the subscription
                    break;
                }
            }
            debug!(%channel, "pub/sub forwarding task finished");
        });
        Ok(rx)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}
