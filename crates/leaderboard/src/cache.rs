// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered-set hot cache for rank and neighbor queries.
//!
//! Layout per cohort:
//! - `xp:{cohort}` — ordered set, score = XP, member = student id
//! - `info:{cohort}` — hash, field = student id, value = entry JSON
//! - `meta:{cohort}` — aggregate metadata JSON
//! - `snapshot:{cohort}:{id}` — snapshot blob written on rebuild
//!
//! Every mutation refreshes the key TTLs; every operation is idempotent.
//! Ranks are recomputed tie-aware on read (competition ranking), so two
//! students with equal XP report the same rank regardless of their
//! position inside the ordered set.

use crate::view::Neighbors;
use chrono::{DateTime, Utc};
use hearth_core::{LeaderboardSnapshot, SnapshotEntry, StudentId};
use hearth_store::{Store, StoreError, StoreOp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cached entry for {0} is undecodable: {1}")]
    Decode(String, String),

    /// Distinguishes absence from a data fault.
    #[error("student {0} is not in the leaderboard")]
    NotInLeaderboard(StudentId),
}

/// Aggregate metadata kept under `meta:{cohort}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub count: u64,
    pub total_xp: u64,
    pub average_xp: f64,
    pub updated_at: DateTime<Utc>,
}

/// XP progress toward the next rank up.
#[derive(Debug, Clone, PartialEq)]
pub struct RankProgress {
    pub current_xp: u64,
    /// XP of the student one rank above; `None` at the top.
    pub next_rank_xp: Option<u64>,
    /// XP needed to surpass them (0 at the top).
    pub xp_needed: u64,
}

/// Store-backed leaderboard cache.
pub struct LeaderboardCache {
    store: Arc<dyn Store>,
    entry_ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_ttl(store, Duration::from_secs(3600))
    }

    pub fn with_ttl(store: Arc<dyn Store>, entry_ttl: Duration) -> Self {
        Self { store, entry_ttl }
    }

    fn xp_key(cohort: &str) -> String {
        format!("xp:{cohort}")
    }

    fn info_key(cohort: &str) -> String {
        format!("info:{cohort}")
    }

    fn meta_key(cohort: &str) -> String {
        format!("meta:{cohort}")
    }

    fn snapshot_key(cohort: &str, id: &str) -> String {
        format!("snapshot:{cohort}:{id}")
    }

    fn touch_ops(&self, cohort: &str) -> Vec<StoreOp> {
        [Self::xp_key(cohort), Self::info_key(cohort), Self::meta_key(cohort)]
            .into_iter()
            .map(|key| StoreOp::Expire {
                key,
                ttl: self.entry_ttl,
            })
            .collect()
    }

    fn entry_ops(cohort: &str, entry: &SnapshotEntry) -> Result<Vec<StoreOp>, CacheError> {
        let json = serde_json::to_string(entry)
            .map_err(|e| CacheError::Decode(entry.student_id.to_string(), e.to_string()))?;
        Ok(vec![
            StoreOp::ZAdd {
                key: Self::xp_key(cohort),
                member: entry.student_id.to_string(),
                score: entry.xp as f64,
            },
            StoreOp::HSet {
                key: Self::info_key(cohort),
                field: entry.student_id.to_string(),
                value: json,
            },
        ])
    }

    fn meta_op(&self, cohort: &str, entries: &[(String, f64)], now: DateTime<Utc>) -> StoreOp {
        let count = entries.len() as u64;
        let total_xp: u64 = entries.iter().map(|(_, xp)| *xp as u64).sum();
        let meta = CacheMeta {
            count,
            total_xp,
            average_xp: if count == 0 {
                0.0
            } else {
                total_xp as f64 / count as f64
            },
            updated_at: now,
        };
        StoreOp::Set {
            key: Self::meta_key(cohort),
            value: serde_json::to_string(&meta).unwrap_or_default(),
            ttl: Some(self.entry_ttl),
        }
    }

    // -- mutations ----------------------------------------------------------

    /// Upsert one entry: ordered-set add, hash set, TTL touch, pipelined.
    pub async fn update_entry(
        &self,
        cohort: &str,
        entry: &SnapshotEntry,
    ) -> Result<(), CacheError> {
        let mut ops = Self::entry_ops(cohort, entry)?;
        ops.extend(self.touch_ops(cohort));
        self.store.exec_batch(ops, false).await?;
        Ok(())
    }

    /// Upsert a batch and recompute the cohort metadata.
    pub async fn update_entries(
        &self,
        cohort: &str,
        entries: &[SnapshotEntry],
    ) -> Result<(), CacheError> {
        let mut ops = Vec::new();
        for entry in entries {
            ops.extend(Self::entry_ops(cohort, entry)?);
        }
        ops.extend(self.touch_ops(cohort));
        self.store.exec_batch(ops, false).await?;

        // Metadata reflects the whole ordered set, not just this batch
        let members = self
            .store
            .zrevrange_with_scores(&Self::xp_key(cohort), 0, -1)
            .await?;
        let meta_op = self.meta_op(cohort, &members, Utc::now());
        self.store.exec_batch(vec![meta_op], false).await?;
        Ok(())
    }

    /// Atomically replace the cohort's cache with a snapshot's entries.
    ///
    /// An empty snapshot clears all cohort data.
    pub async fn rebuild_from_snapshot(
        &self,
        snapshot: &LeaderboardSnapshot,
    ) -> Result<(), CacheError> {
        let cohort = snapshot.cohort.as_str();
        let mut ops = vec![
            StoreOp::Del {
                key: Self::xp_key(cohort),
            },
            StoreOp::Del {
                key: Self::info_key(cohort),
            },
            StoreOp::Del {
                key: Self::meta_key(cohort),
            },
        ];
        for entry in &snapshot.entries {
            ops.extend(Self::entry_ops(cohort, entry)?);
        }
        let members: Vec<(String, f64)> = snapshot
            .entries
            .iter()
            .map(|e| (e.student_id.to_string(), e.xp as f64))
            .collect();
        ops.push(self.meta_op(cohort, &members, snapshot.taken_at));
        if let Ok(blob) = serde_json::to_string(snapshot) {
            ops.push(StoreOp::Set {
                key: Self::snapshot_key(cohort, snapshot.id.as_str()),
                value: blob,
                ttl: None,
            });
        }
        ops.extend(self.touch_ops(cohort));
        self.store.exec_batch(ops, true).await?;
        debug!(cohort, entries = snapshot.entries.len(), "cache rebuilt");
        Ok(())
    }

    /// Drop the cohort's three live keys.
    pub async fn invalidate(&self, cohort: &str) -> Result<(), CacheError> {
        self.store
            .exec_batch(
                vec![
                    StoreOp::Del {
                        key: Self::xp_key(cohort),
                    },
                    StoreOp::Del {
                        key: Self::info_key(cohort),
                    },
                    StoreOp::Del {
                        key: Self::meta_key(cohort),
                    },
                ],
                false,
            )
            .await?;
        Ok(())
    }

    /// Drop every cohort's live keys.
    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let mut removed = 0;
        for pattern in ["xp:*", "info:*", "meta:*"] {
            removed += self.store.del_matching(pattern).await?;
        }
        Ok(removed)
    }

    // -- queries ------------------------------------------------------------

    /// Top `n` entries with tie-aware ranks attached.
    pub async fn get_top(&self, cohort: &str, n: usize) -> Result<Vec<SnapshotEntry>, CacheError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let members = self
            .store
            .zrevrange_with_scores(&Self::xp_key(cohort), 0, n as i64 - 1)
            .await?;
        self.attach_entries(cohort, &members, 0).await
    }

    /// One page of the ranking. Size clamps into [1, 100]; pages below 1
    /// are treated as page 1.
    pub async fn get_page(
        &self,
        cohort: &str,
        page: usize,
        size: usize,
    ) -> Result<Vec<SnapshotEntry>, CacheError> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let page = page.max(1);
        let start = ((page - 1) * size) as i64;
        let stop = (page * size) as i64 - 1;
        let members = self
            .store
            .zrevrange_with_scores(&Self::xp_key(cohort), start, stop)
            .await?;
        self.attach_entries(cohort, &members, start as u64).await
    }

    /// 1-based tie-aware rank: one more than the number of students with
    /// strictly more XP.
    pub async fn get_rank(&self, cohort: &str, student_id: &StudentId) -> Result<u32, CacheError> {
        let score = self
            .store
            .zscore(&Self::xp_key(cohort), student_id.as_str())
            .await?
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?;
        let ahead = self
            .store
            .zrangebyscore_gt(&Self::xp_key(cohort), score)
            .await?;
        Ok(ahead.len() as u32 + 1)
    }

    /// Entries `k` above and `k` below the student, clamped at bounds.
    pub async fn get_neighbors(
        &self,
        cohort: &str,
        student_id: &StudentId,
        k: usize,
    ) -> Result<Neighbors<SnapshotEntry>, CacheError> {
        let pos = self
            .store
            .zrevrank(&Self::xp_key(cohort), student_id.as_str())
            .await?
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?;

        let start = pos.saturating_sub(k as u64);
        let stop = pos + k as u64;
        let members = self
            .store
            .zrevrange_with_scores(&Self::xp_key(cohort), start as i64, stop as i64)
            .await?;
        let entries = self.attach_entries(cohort, &members, start).await?;

        let split = (pos - start) as usize;
        let mut above = entries;
        if split >= above.len() {
            return Err(CacheError::NotInLeaderboard(student_id.clone()));
        }
        let below = above.split_off(split + 1);
        let current = above
            .pop()
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?;
        Ok(Neighbors {
            above,
            current,
            below,
        })
    }

    /// XP needed to surpass the student currently at `target_rank`
    /// (1-based): `max(0, target_xp - current_xp + 1)`.
    pub async fn get_xp_delta(
        &self,
        cohort: &str,
        student_id: &StudentId,
        target_rank: u32,
    ) -> Result<u64, CacheError> {
        let current = self
            .store
            .zscore(&Self::xp_key(cohort), student_id.as_str())
            .await?
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?
            as u64;

        let idx = target_rank.max(1) as i64 - 1;
        let target = self
            .store
            .zrevrange_with_scores(&Self::xp_key(cohort), idx, idx)
            .await?;
        let Some((_, target_xp)) = target.first() else {
            // No one holds that rank; nothing to surpass
            return Ok(0);
        };
        let target_xp = *target_xp as u64;
        Ok((target_xp + 1).saturating_sub(current))
    }

    /// Progress toward the student one rank above.
    pub async fn get_rank_progress(
        &self,
        cohort: &str,
        student_id: &StudentId,
    ) -> Result<RankProgress, CacheError> {
        let key = Self::xp_key(cohort);
        let current_xp = self
            .store
            .zscore(&key, student_id.as_str())
            .await?
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?
            as u64;
        let pos = self
            .store
            .zrevrank(&key, student_id.as_str())
            .await?
            .ok_or_else(|| CacheError::NotInLeaderboard(student_id.clone()))?;

        if pos == 0 {
            return Ok(RankProgress {
                current_xp,
                next_rank_xp: None,
                xp_needed: 0,
            });
        }
        let above = self
            .store
            .zrevrange_with_scores(&key, pos as i64 - 1, pos as i64 - 1)
            .await?;
        let next_rank_xp = above.first().map(|(_, xp)| *xp as u64);
        let xp_needed = next_rank_xp
            .map(|xp| (xp + 1).saturating_sub(current_xp))
            .unwrap_or(0);
        Ok(RankProgress {
            current_xp,
            next_rank_xp,
            xp_needed,
        })
    }

    /// Cohort metadata, if cached.
    pub async fn get_meta(&self, cohort: &str) -> Result<Option<CacheMeta>, CacheError> {
        let Some(raw) = self.store.get(&Self::meta_key(cohort)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Decode(Self::meta_key(cohort), e.to_string()))
    }

    /// Total members in the cohort's ordered set.
    pub async fn count(&self, cohort: &str) -> Result<u64, CacheError> {
        Ok(self.store.zcard(&Self::xp_key(cohort)).await?)
    }

    /// Fetch hash entries for ordered-set members and attach tie-aware
    /// ranks. `offset` is the global 0-based index of the first member.
    async fn attach_entries(
        &self,
        cohort: &str,
        members: &[(String, f64)],
        offset: u64,
    ) -> Result<Vec<SnapshotEntry>, CacheError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let fields: Vec<String> = members.iter().map(|(id, _)| id.clone()).collect();
        let raws = self.store.hmget(&Self::info_key(cohort), &fields).await?;

        // The first row's rank needs global tie context
        let first_rank = {
            let ahead = self
                .store
                .zrangebyscore_gt(&Self::xp_key(cohort), members[0].1)
                .await?;
            ahead.len() as u32 + 1
        };

        let mut entries: Vec<SnapshotEntry> = Vec::with_capacity(members.len());
        for (i, ((id, score), raw)) in members.iter().zip(raws).enumerate() {
            let raw = raw.ok_or_else(|| {
                CacheError::Decode(id.clone(), "missing info-hash row".to_string())
            })?;
            let mut entry: SnapshotEntry = serde_json::from_str(&raw)
                .map_err(|e| CacheError::Decode(id.clone(), e.to_string()))?;
            entry.rank = if i == 0 {
                first_rank
            } else if *score == members[i - 1].1 {
                entries[i - 1].rank
            } else {
                offset as u32 + i as u32 + 1
            };
            entry.xp = *score as u64;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
