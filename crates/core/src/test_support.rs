// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared by tests across the workspace.

use crate::clock::FakeClock;
use crate::id::{SnapshotId, StudentId};
use crate::snapshot::{LeaderboardSnapshot, SnapshotEntry};
use crate::student::{Student, XP_PER_LEVEL};
use chrono::Utc;

/// Build an active student with the given XP in the default cohort.
pub fn student(id: &str, display_name: &str, xp: u64) -> Student {
    student_in("cohort-24", id, display_name, xp)
}

/// Build an active student with the given XP in a specific cohort.
pub fn student_in(cohort: &str, id: &str, display_name: &str, xp: u64) -> Student {
    let clock = FakeClock::new();
    let login = display_name.to_lowercase().replace(' ', ".");
    let principal = id
        .bytes()
        .fold(0i64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as i64));
    let mut s = Student::new(
        StudentId::new(id),
        Some(principal),
        login,
        display_name,
        cohort,
        &clock,
    );
    s.xp = xp;
    s
}

/// Build a snapshot entry row.
pub fn snapshot_entry(id: &str, display_name: &str, rank: u32, xp: u64) -> SnapshotEntry {
    SnapshotEntry {
        student_id: StudentId::new(id),
        login: display_name.to_lowercase().replace(' ', "."),
        display_name: display_name.to_string(),
        rank,
        xp,
        level: (xp / XP_PER_LEVEL) as u32,
        rank_change: 0,
        online: false,
        available_for_help: false,
        helper_rating: 0.0,
        help_count: 0,
    }
}

/// Build a snapshot from (id, name, rank, xp) rows.
pub fn snapshot(cohort: &str, rows: &[(&str, &str, u32, u64)]) -> LeaderboardSnapshot {
    let entries = rows
        .iter()
        .map(|(id, name, rank, xp)| snapshot_entry(id, name, *rank, *xp))
        .collect();
    LeaderboardSnapshot::from_entries(SnapshotId::new("snap-test"), cohort, Utc::now(), entries)
}
