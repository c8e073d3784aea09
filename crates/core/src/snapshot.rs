// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leaderboard snapshots and rank history.
//!
//! Snapshots and rank history are append-only; cleanup deletes snapshots
//! older than a configured horizon.

use crate::id::{SnapshotId, StudentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cohort tag used for the all-cohorts leaderboard.
pub const ALL_COHORTS: &str = "all";

/// One ranked row inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub student_id: StudentId,
    pub login: String,
    pub display_name: String,
    /// 1-based competition rank (ties share, next distinct value skips).
    pub rank: u32,
    pub xp: u64,
    pub level: u32,
    /// Positions climbed since the previous snapshot (negative = dropped).
    pub rank_change: i32,
    pub online: bool,
    pub available_for_help: bool,
    pub helper_rating: f32,
    pub help_count: u32,
}

/// A persisted ranking state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub id: SnapshotId,
    /// Cohort tag, or [`ALL_COHORTS`].
    pub cohort: String,
    pub taken_at: DateTime<Utc>,
    pub total_students: u32,
    pub total_xp: u64,
    pub average_xp: f64,
    pub entries: Vec<SnapshotEntry>,
}

impl LeaderboardSnapshot {
    /// Materialize a snapshot from ranked entries, computing totals.
    pub fn from_entries(
        id: SnapshotId,
        cohort: impl Into<String>,
        taken_at: DateTime<Utc>,
        entries: Vec<SnapshotEntry>,
    ) -> Self {
        let total_students = entries.len() as u32;
        let total_xp: u64 = entries.iter().map(|e| e.xp).sum();
        let average_xp = if total_students == 0 {
            0.0
        } else {
            total_xp as f64 / total_students as f64
        };
        Self {
            id,
            cohort: cohort.into(),
            taken_at,
            total_students,
            total_xp,
            average_xp,
            entries,
        }
    }

    pub fn entry_for(&self, student_id: &StudentId) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| &e.student_id == student_id)
    }
}

/// Append-only record of a student's rank at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankHistoryEntry {
    pub student_id: StudentId,
    pub rank: u32,
    pub xp: u64,
    pub snapshot_id: SnapshotId,
    pub taken_at: DateTime<Utc>,
    pub rank_change: i32,
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
