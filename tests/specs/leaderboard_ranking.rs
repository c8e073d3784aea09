// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ranking scenarios: tie handling and rebuild idempotence across the
//! builder, cache, and view together.

use hearth_core::test_support::student;
use hearth_core::{LeaderboardSnapshot, SnapshotId, StudentId};
use hearth_leaderboard::{build_snapshot, LeaderboardCache, LeaderboardView};
use hearth_store::MemoryStore;
use std::sync::Arc;

fn tie_snapshot() -> LeaderboardSnapshot {
    build_snapshot(
        SnapshotId::new("snap-1"),
        None,
        vec![
            student("stu-alice", "Alice", 1200),
            student("stu-bob", "Bob", 1200),
            student("stu-carol", "Carol", 900),
        ],
        None,
        chrono::Utc::now(),
    )
}

#[tokio::test]
async fn rank_tie_shares_and_skips() {
    let cache = LeaderboardCache::new(Arc::new(MemoryStore::new()));
    let snapshot = tie_snapshot();
    cache.rebuild_from_snapshot(&snapshot).await.unwrap();

    let top = cache.get_top("all", 3).await.unwrap();
    let got: Vec<(&str, u32)> = top
        .iter()
        .map(|e| (e.display_name.as_str(), e.rank))
        .collect();
    assert_eq!(got, vec![("Alice", 1), ("Bob", 1), ("Carol", 3)]);

    assert_eq!(
        cache
            .get_rank("all", &StudentId::new("stu-bob"))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        cache
            .get_rank("all", &StudentId::new("stu-carol"))
            .await
            .unwrap(),
        3
    );

    // The view agrees with the cache
    let view = LeaderboardView::new();
    view.rebuild_from_snapshot(&snapshot);
    let view_top = view.get_top(3);
    assert_eq!(view_top[0].rank, 1);
    assert_eq!(view_top[1].rank, 1);
    assert_eq!(view_top[2].rank, 3);
}

#[tokio::test]
async fn rebuild_twice_is_idempotent() {
    let cache = LeaderboardCache::new(Arc::new(MemoryStore::new()));
    let snapshot = build_snapshot(
        SnapshotId::new("snap-2"),
        None,
        vec![student("stu-x", "Xena", 500), student("stu-y", "Yara", 400)],
        None,
        chrono::Utc::now(),
    );

    cache.rebuild_from_snapshot(&snapshot).await.unwrap();
    cache.rebuild_from_snapshot(&snapshot).await.unwrap();

    let meta = cache.get_meta("all").await.unwrap().unwrap();
    assert_eq!(meta.count, 2);
    assert_eq!(meta.total_xp, 900);
    assert!((meta.average_xp - 450.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn snapshot_minimum_rank_is_one_and_sorted() {
    let snapshot = tie_snapshot();
    assert_eq!(snapshot.entries.iter().map(|e| e.rank).min(), Some(1));
    assert!(snapshot.entries.windows(2).all(|w| w[0].xp >= w[1].xp));
}

#[tokio::test]
async fn rank_matches_top_position_for_everyone() {
    let cache = LeaderboardCache::new(Arc::new(MemoryStore::new()));
    let snapshot = build_snapshot(
        SnapshotId::new("snap-3"),
        None,
        vec![
            student("stu-a", "Alice", 500),
            student("stu-b", "Bob", 400),
            student("stu-c", "Carol", 400),
            student("stu-d", "Dave", 100),
        ],
        None,
        chrono::Utc::now(),
    );
    cache.rebuild_from_snapshot(&snapshot).await.unwrap();

    let total = cache.count("all").await.unwrap() as usize;
    let top = cache.get_top("all", total).await.unwrap();
    for entry in &top {
        let rank = cache.get_rank("all", &entry.student_id).await.unwrap();
        assert_eq!(rank, entry.rank, "{} disagrees", entry.display_name);
    }
}
