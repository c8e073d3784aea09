// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hearth_core::test_support::{snapshot, student, student_in};
use hearth_core::StudentStatus;
use yare::parameterized;

#[parameterized(
    empty = { &[], &[] },
    distinct = { &[300, 200, 100], &[1, 2, 3] },
    leading_tie = { &[500, 500, 300], &[1, 1, 3] },
    middle_tie = { &[500, 300, 300, 100], &[1, 2, 2, 4] },
    all_tied = { &[100, 100, 100], &[1, 1, 1] },
    double_tie = { &[900, 900, 700, 700, 500], &[1, 1, 3, 3, 5] },
)]
fn competition_rank_assignment(scores: &[u64], expected: &[u32]) {
    assert_eq!(competition_ranks(scores), expected);
}

#[test]
fn orders_by_xp_then_name() {
    let entries = rank_students(
        vec![
            student("stu-c", "Carol", 900),
            student("stu-b", "Bob", 1200),
            student("stu-a", "Alice", 1200),
        ],
        None,
    );

    let names: Vec<_> = entries.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    let ranks: Vec<_> = entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 1, 3]);
}

#[test]
fn inactive_students_are_excluded() {
    let mut gone = student("stu-x", "Xavier", 9000);
    gone.status = StudentStatus::Left;
    let mut idle = student("stu-y", "Yara", 8000);
    idle.status = StudentStatus::Inactive;

    let entries = rank_students(vec![gone, idle, student("stu-a", "Alice", 100)], None);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].display_name, "Alice");
    assert_eq!(entries[0].rank, 1);
}

#[test]
fn cohort_filter_restricts() {
    let entries = rank_students(
        vec![
            student_in("cohort-24", "stu-a", "Alice", 1200),
            student_in("cohort-25", "stu-b", "Bob", 2000),
            student_in("cohort-24", "stu-c", "Carol", 900),
        ],
        Some("cohort-24"),
    );

    let names: Vec<_> = entries.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Carol"]);
    assert_eq!(entries[0].rank, 1, "ranks are cohort-local");
}

#[test]
fn rank_changes_against_previous() {
    let previous = snapshot(
        "all",
        &[
            ("stu-a", "Alice", 1, 1000),
            ("stu-b", "Bob", 2, 900),
            ("stu-c", "Carol", 3, 800),
        ],
    );

    // Carol overtakes Bob; Dave is new
    let mut entries = rank_students(
        vec![
            student("stu-a", "Alice", 1100),
            student("stu-c", "Carol", 950),
            student("stu-b", "Bob", 910),
            student("stu-d", "Dave", 100),
        ],
        None,
    );
    apply_rank_changes(&mut entries, &previous);

    let by_id = |id: &str| entries.iter().find(|e| e.student_id == id).unwrap();
    assert_eq!(by_id("stu-a").rank_change, 0);
    assert_eq!(by_id("stu-c").rank_change, 1, "climbed 3 -> 2");
    assert_eq!(by_id("stu-b").rank_change, -1, "dropped 2 -> 3");
    assert_eq!(by_id("stu-d").rank_change, 0, "new entrant");
}

#[test]
fn snapshot_totals_and_minimum_rank() {
    let snap = build_snapshot(
        hearth_core::SnapshotId::new("snap-1"),
        None,
        vec![
            student("stu-a", "Alice", 1200),
            student("stu-b", "Bob", 1200),
            student("stu-c", "Carol", 900),
        ],
        None,
        chrono::Utc::now(),
    );

    assert_eq!(snap.cohort, ALL_COHORTS);
    assert_eq!(snap.total_students, 3);
    assert_eq!(snap.total_xp, 3300);
    assert_eq!(snap.entries.iter().map(|e| e.rank).min(), Some(1));

    // Sorted descending with shared ranks
    let ranks: Vec<_> = snap.entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 1, 3]);
    assert!(snap
        .entries
        .windows(2)
        .all(|w| w[0].xp >= w[1].xp), "descending XP");
}
