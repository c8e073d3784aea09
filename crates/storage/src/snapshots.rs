// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot repository.
//!
//! A snapshot, its entry rows, and the matching rank-history rows are
//! written in one transaction: either the whole ranking state lands or
//! none of it does.

use crate::db::map_sqlx_error;
use chrono::{DateTime, Utc};
use hearth_core::{
    DomainError, LeaderboardSnapshot, RankHistoryEntry, SnapshotEntry, SnapshotId, StudentId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

fn row_to_entry(row: &PgRow) -> Result<SnapshotEntry, sqlx::Error> {
    Ok(SnapshotEntry {
        student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
        login: row.try_get("login")?,
        display_name: row.try_get("display_name")?,
        rank: row.try_get::<i32, _>("rank")?.max(0) as u32,
        xp: row.try_get::<i64, _>("xp")?.max(0) as u64,
        level: row.try_get::<i32, _>("level")?.max(0) as u32,
        rank_change: row.try_get("rank_change")?,
        online: row.try_get("online")?,
        available_for_help: row.try_get("available_for_help")?,
        helper_rating: row.try_get("helper_rating")?,
        help_count: row.try_get::<i32, _>("help_count")?.max(0) as u32,
    })
}

const SELECT_ENTRY: &str = "SELECT student_id, login, display_name, rank, xp, level, \
     rank_change, online, available_for_help, helper_rating, help_count \
     FROM leaderboard_entries";

const INSERT_RANK_HISTORY: &str =
    "INSERT INTO rank_history (student_id, snapshot_id, rank, xp, taken_at, rank_change) \
     VALUES ($1, $2, $3, $4, $5, $6) \
     ON CONFLICT (student_id, taken_at) DO NOTHING";

#[derive(Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a snapshot with its entries and rank-history rows.
    pub async fn save(&self, snapshot: &LeaderboardSnapshot) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO leaderboard_snapshots (id, cohort, taken_at, total_students, total_xp, average_xp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(snapshot.id.as_str())
        .bind(&snapshot.cohort)
        .bind(snapshot.taken_at)
        .bind(snapshot.total_students as i32)
        .bind(snapshot.total_xp as i64)
        .bind(snapshot.average_xp)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for entry in &snapshot.entries {
            sqlx::query(
                "INSERT INTO leaderboard_entries (snapshot_id, student_id, login, display_name, \
                 rank, xp, level, rank_change, online, available_for_help, helper_rating, help_count) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(snapshot.id.as_str())
            .bind(entry.student_id.as_str())
            .bind(&entry.login)
            .bind(&entry.display_name)
            .bind(entry.rank as i32)
            .bind(entry.xp as i64)
            .bind(entry.level as i32)
            .bind(entry.rank_change)
            .bind(entry.online)
            .bind(entry.available_for_help)
            .bind(entry.helper_rating)
            .bind(entry.help_count as i32)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            sqlx::query(INSERT_RANK_HISTORY)
                .bind(entry.student_id.as_str())
                .bind(snapshot.id.as_str())
                .bind(entry.rank as i32)
                .bind(entry.xp as i64)
                .bind(snapshot.taken_at)
                .bind(entry.rank_change)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(snapshot = %snapshot.id, entries = snapshot.entries.len(), "snapshot saved");
        Ok(())
    }

    async fn load_entries(&self, id: &str) -> Result<Vec<SnapshotEntry>, DomainError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENTRY} WHERE snapshot_id = $1 ORDER BY rank, display_name"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_entry).collect::<Result<_, _>>().map_err(map_sqlx_error)
    }

    async fn hydrate(&self, row: &PgRow) -> Result<LeaderboardSnapshot, DomainError> {
        let id: String = row.try_get("id").map_err(map_sqlx_error)?;
        let entries = self.load_entries(&id).await?;
        (|| -> Result<LeaderboardSnapshot, sqlx::Error> {
            Ok(LeaderboardSnapshot {
                id: SnapshotId::new(id.clone()),
                cohort: row.try_get("cohort")?,
                taken_at: row.try_get("taken_at")?,
                total_students: row.try_get::<i32, _>("total_students")?.max(0) as u32,
                total_xp: row.try_get::<i64, _>("total_xp")?.max(0) as u64,
                average_xp: row.try_get("average_xp")?,
                entries,
            })
        })()
        .map_err(map_sqlx_error)
    }

    const SELECT: &'static str =
        "SELECT id, cohort, taken_at, total_students, total_xp, average_xp FROM leaderboard_snapshots";

    pub async fn by_id(&self, id: &SnapshotId) -> Result<Option<LeaderboardSnapshot>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", Self::SELECT))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn latest_for_cohort(
        &self,
        cohort: &str,
    ) -> Result<Option<LeaderboardSnapshot>, DomainError> {
        let row = sqlx::query(&format!(
            "{} WHERE cohort = $1 ORDER BY taken_at DESC LIMIT 1",
            Self::SELECT
        ))
        .bind(cohort)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Most recent snapshot taken at or before `at`.
    pub async fn at_or_before(
        &self,
        cohort: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<LeaderboardSnapshot>, DomainError> {
        let row = sqlx::query(&format!(
            "{} WHERE cohort = $1 AND taken_at <= $2 ORDER BY taken_at DESC LIMIT 1",
            Self::SELECT
        ))
        .bind(cohort)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// The snapshot immediately preceding the given one in its cohort.
    pub async fn previous_of(
        &self,
        id: &SnapshotId,
    ) -> Result<Option<LeaderboardSnapshot>, DomainError> {
        let row = sqlx::query(&format!(
            "{} WHERE cohort = (SELECT cohort FROM leaderboard_snapshots WHERE id = $1) \
             AND taken_at < (SELECT taken_at FROM leaderboard_snapshots WHERE id = $1) \
             ORDER BY taken_at DESC LIMIT 1",
            Self::SELECT
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Snapshots in `[from, to)`, oldest first, without entries.
    pub async fn list_in_range(
        &self,
        cohort: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardSnapshot>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE cohort = $1 AND taken_at >= $2 AND taken_at < $3 ORDER BY taken_at",
            Self::SELECT
        ))
        .bind(cohort)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<LeaderboardSnapshot, sqlx::Error> {
                Ok(LeaderboardSnapshot {
                    id: SnapshotId::new(row.try_get::<String, _>("id")?),
                    cohort: row.try_get("cohort")?,
                    taken_at: row.try_get("taken_at")?,
                    total_students: row.try_get::<i32, _>("total_students")?.max(0) as u32,
                    total_xp: row.try_get::<i64, _>("total_xp")?.max(0) as u64,
                    average_xp: row.try_get("average_xp")?,
                    entries: Vec::new(),
                })
            })
            .collect::<Result<_, _>>()
            .map_err(map_sqlx_error)
    }

    /// Delete snapshots older than the horizon. Entry rows cascade.
    /// Returns the number of snapshots removed.
    pub async fn delete_older_than(&self, horizon: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM leaderboard_snapshots WHERE taken_at < $1")
            .bind(horizon)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    /// A student's rank history, newest first.
    pub async fn rank_history(
        &self,
        student_id: &StudentId,
        limit: i64,
    ) -> Result<Vec<RankHistoryEntry>, DomainError> {
        let rows = sqlx::query(
            "SELECT student_id, snapshot_id, rank, xp, taken_at, rank_change \
             FROM rank_history WHERE student_id = $1 ORDER BY taken_at DESC LIMIT $2",
        )
        .bind(student_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<RankHistoryEntry, sqlx::Error> {
                Ok(RankHistoryEntry {
                    student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
                    rank: row.try_get::<i32, _>("rank")?.max(0) as u32,
                    xp: row.try_get::<i64, _>("xp")?.max(0) as u64,
                    snapshot_id: SnapshotId::new(row.try_get::<String, _>("snapshot_id")?),
                    taken_at: row.try_get("taken_at")?,
                    rank_change: row.try_get("rank_change")?,
                })
            })
            .collect::<Result<_, _>>()
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
#[path = "snapshots_tests.rs"]
mod tests;
