// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::snapshot_entry;

#[test]
fn from_entries_computes_totals() {
    let entries = vec![
        snapshot_entry("stu-1", "Alice", 1, 1200),
        snapshot_entry("stu-2", "Bob", 1, 1200),
        snapshot_entry("stu-3", "Carol", 3, 900),
    ];
    let snap = LeaderboardSnapshot::from_entries(
        SnapshotId::new("snap-1"),
        ALL_COHORTS,
        Utc::now(),
        entries,
    );

    assert_eq!(snap.total_students, 3);
    assert_eq!(snap.total_xp, 3300);
    assert!((snap.average_xp - 1100.0).abs() < f64::EPSILON);
}

#[test]
fn empty_snapshot_has_zero_average() {
    let snap = LeaderboardSnapshot::from_entries(
        SnapshotId::new("snap-0"),
        "cohort-24",
        Utc::now(),
        Vec::new(),
    );
    assert_eq!(snap.total_students, 0);
    assert_eq!(snap.average_xp, 0.0);
}

#[test]
fn entry_lookup() {
    let snap = LeaderboardSnapshot::from_entries(
        SnapshotId::new("snap-1"),
        ALL_COHORTS,
        Utc::now(),
        vec![snapshot_entry("stu-1", "Alice", 1, 1200)],
    );

    assert_eq!(
        snap.entry_for(&StudentId::new("stu-1")).map(|e| e.rank),
        Some(1)
    );
    assert!(snap.entry_for(&StudentId::new("stu-9")).is_none());
}

#[test]
fn snapshot_serde_round_trip() {
    let snap = LeaderboardSnapshot::from_entries(
        SnapshotId::new("snap-1"),
        "cohort-24",
        Utc::now(),
        vec![snapshot_entry("stu-1", "Alice", 1, 1200)],
    );
    let json = serde_json::to_string(&snap).unwrap();
    let parsed: LeaderboardSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, snap);
}
