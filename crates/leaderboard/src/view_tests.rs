// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hearth_core::test_support::{snapshot, student, student_in};
use yare::parameterized;

fn view_with(rows: &[(&str, &str, u64)]) -> LeaderboardView {
    let view = LeaderboardView::new();
    for (id, name, xp) in rows {
        view.update_entry(ViewEntry::from_student(&student(id, name, *xp)));
    }
    view
}

#[test]
fn top_is_ordered_with_shared_ranks() {
    let view = view_with(&[
        ("stu-c", "Carol", 900),
        ("stu-a", "Alice", 1200),
        ("stu-b", "Bob", 1200),
    ]);

    let top = view.get_top(3);
    let got: Vec<_> = top
        .iter()
        .map(|e| (e.display_name.as_str(), e.rank))
        .collect();
    assert_eq!(got, vec![("Alice", 1), ("Bob", 1), ("Carol", 3)]);
}

#[test]
fn update_entry_resorts_on_xp_change() {
    let view = view_with(&[("stu-a", "Alice", 1000), ("stu-b", "Bob", 900)]);

    // Bob overtakes Alice
    let mut bob = view.get_by_student(&StudentId::new("stu-b")).unwrap();
    bob.xp = 1500;
    view.update_entry(bob);

    let top = view.get_top(2);
    assert_eq!(top[0].display_name, "Bob");
    assert_eq!(top[0].rank, 1);
    assert_eq!(top[1].rank, 2);
}

#[test]
fn serial_updates_read_latest_state() {
    let view = view_with(&[("stu-a", "Alice", 100)]);
    let id = StudentId::new("stu-a");

    let mut entry = view.get_by_student(&id).unwrap();
    entry.xp = 200;
    view.update_entry(entry.clone());
    entry.xp = 300;
    view.update_entry(entry);

    assert_eq!(view.get_by_student(&id).unwrap().xp, 300);
}

#[parameterized(
    normal = { 2, 2, &["Carol", "Dave"] },
    first = { 1, 2, &["Alice", "Bob"] },
    page_zero_is_one = { 0, 2, &["Alice", "Bob"] },
    beyond_end = { 9, 2, &[] },
)]
fn paging(page: usize, size: usize, expected: &[&str]) {
    let view = view_with(&[
        ("stu-a", "Alice", 400),
        ("stu-b", "Bob", 300),
        ("stu-c", "Carol", 200),
        ("stu-d", "Dave", 100),
    ]);

    let names: Vec<String> = view
        .get_page(page, size)
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn page_size_clamps() {
    let view = view_with(&[("stu-a", "Alice", 400), ("stu-b", "Bob", 300)]);

    // size 0 behaves as 1
    assert_eq!(view.get_page(1, 0).len(), 1);
    // size beyond the cap behaves as 100
    assert_eq!(view.get_page(1, 5000).len(), 2);
}

#[test]
fn rebuild_replaces_everything_and_bumps_version() {
    let view = view_with(&[("stu-x", "Xavier", 9999)]);
    assert_eq!(view.version(), 0);

    let snap = snapshot(
        "all",
        &[("stu-a", "Alice", 1, 500), ("stu-b", "Bob", 2, 400)],
    );
    view.rebuild_from_snapshot(&snap);

    assert_eq!(view.version(), 1);
    assert_eq!(view.len(), 2);
    assert!(view.get_by_student(&StudentId::new("stu-x")).is_none());
    assert_eq!(view.get_top(1)[0].display_name, "Alice");
}

#[test]
fn online_tracking() {
    let view = view_with(&[("stu-a", "Alice", 400), ("stu-b", "Bob", 300)]);
    let alice = StudentId::new("stu-a");

    assert_eq!(view.online_count(), 0);
    view.update_online_status(&alice, true);
    assert_eq!(view.online_count(), 1);
    assert!(view.get_by_student(&alice).unwrap().online);

    let online = view.get_online();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].display_name, "Alice");

    view.update_online_status(&alice, false);
    assert_eq!(view.online_count(), 0);
}

#[test]
fn daily_progress_and_streak_merge() {
    let view = view_with(&[("stu-a", "Alice", 400)]);
    let id = StudentId::new("stu-a");

    view.update_daily_progress(
        &id,
        DailyStats {
            xp_gained: 120,
            tasks_completed: 3,
            streak_day: 5,
        },
    );
    view.update_streak(&id, 5);

    let entry = view.get_by_student(&id).unwrap();
    assert_eq!(entry.today.as_ref().unwrap().xp_gained, 120);
    assert_eq!(entry.streak, 5);

    // Sync upsert preserves the merged view-local fields
    view.upsert_student(&student("stu-a", "Alice", 520));
    let entry = view.get_by_student(&id).unwrap();
    assert_eq!(entry.xp, 520);
    assert_eq!(entry.today.as_ref().unwrap().tasks_completed, 3);
    assert_eq!(entry.streak, 5);
}

#[test]
fn help_capability_recounts() {
    let view = view_with(&[("stu-a", "Alice", 400), ("stu-b", "Bob", 300)]);
    assert_eq!(view.available_helpers_count(), 0);

    view.update_help_capability(&StudentId::new("stu-a"), true, 4.5, 10);
    view.update_help_capability(&StudentId::new("stu-b"), true, 3.0, 0);
    // Bob has no help count, so he is not yet a helper
    assert_eq!(view.available_helpers_count(), 1);

    view.update_help_capability(&StudentId::new("stu-b"), true, 3.0, 2);
    assert_eq!(view.available_helpers_count(), 2);
}

#[test]
fn available_helpers_ordering() {
    let view = view_with(&[
        ("stu-a", "Alice", 400),
        ("stu-b", "Bob", 900),
        ("stu-c", "Carol", 100),
    ]);
    view.update_help_capability(&StudentId::new("stu-a"), true, 5.0, 50);
    view.update_help_capability(&StudentId::new("stu-b"), true, 5.0, 50);
    view.update_help_capability(&StudentId::new("stu-c"), true, 1.0, 1);
    view.update_online_status(&StudentId::new("stu-c"), true);

    let helpers = view.get_available_helpers();
    let names: Vec<_> = helpers.iter().map(|e| e.display_name.as_str()).collect();
    // Online Carol first despite the weakest score; then score ties break by XP
    assert_eq!(names, vec!["Carol", "Bob", "Alice"]);
}

#[test]
fn helper_index_dedup_and_ordering() {
    let view = view_with(&[
        ("stu-a", "Alice", 400),
        ("stu-b", "Bob", 900),
    ]);
    let task = TaskId::new("task-graphs");

    assert!(view.add_task_completion(&StudentId::new("stu-a"), task.clone()));
    assert!(!view.add_task_completion(&StudentId::new("stu-a"), task.clone()));
    assert!(view.add_task_completion(&StudentId::new("stu-b"), task.clone()));

    view.update_help_capability(&StudentId::new("stu-a"), true, 4.0, 5);
    let helpers = view.find_helpers_for_task(&task);
    let names: Vec<_> = helpers.iter().map(|e| e.display_name.as_str()).collect();
    // Neither online: available-first puts Alice ahead of higher-XP Bob
    assert_eq!(names, vec!["Alice", "Bob"]);

    assert!(view.find_helpers_for_task(&TaskId::new("task-unknown")).is_empty());
}

#[test]
fn neighbors_window_and_bounds() {
    let view = view_with(&[
        ("stu-a", "Alice", 500),
        ("stu-b", "Bob", 400),
        ("stu-c", "Carol", 300),
        ("stu-d", "Dave", 200),
        ("stu-e", "Erin", 100),
    ]);

    let mid = view.get_neighbors(&StudentId::new("stu-c"), 1).unwrap();
    assert_eq!(mid.above.len(), 1);
    assert_eq!(mid.below.len(), 1);
    assert_eq!(mid.current.display_name, "Carol");
    assert_eq!(mid.len(), 3);

    // Window at rank 1 has nothing above
    let top = view.get_neighbors(&StudentId::new("stu-a"), 2).unwrap();
    assert!(top.above.is_empty());
    assert_eq!(top.below.len(), 2);

    // Window clamps at the bottom
    let bottom = view.get_neighbors(&StudentId::new("stu-e"), 3).unwrap();
    assert_eq!(bottom.above.len(), 3);
    assert!(bottom.below.is_empty());

    assert!(view.get_neighbors(&StudentId::new("stu-z"), 1).is_none());
}

#[test]
fn neighbors_stay_within_cohort() {
    let view = LeaderboardView::new();
    for (cohort, id, name, xp) in [
        ("cohort-24", "stu-a", "Alice", 500),
        ("cohort-25", "stu-b", "Bob", 450),
        ("cohort-24", "stu-c", "Carol", 400),
        ("cohort-25", "stu-d", "Dave", 350),
        ("cohort-24", "stu-e", "Erin", 300),
    ] {
        view.update_entry(ViewEntry::from_student(&student_in(cohort, id, name, xp)));
    }

    let neighbors = view.get_neighbors(&StudentId::new("stu-c"), 2).unwrap();
    let mut all: Vec<&ViewEntry> = neighbors.above.iter().collect();
    all.push(&neighbors.current);
    all.extend(neighbors.below.iter());

    assert!(all.iter().all(|e| e.cohort == "cohort-24"));
    assert!(all.len() <= 5);
    let names: Vec<_> = all.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Carol", "Erin"]);
}

#[test]
fn cohort_ranks_are_local() {
    let view = LeaderboardView::new();
    for (cohort, id, name, xp) in [
        ("cohort-24", "stu-a", "Alice", 500),
        ("cohort-25", "stu-b", "Bob", 450),
        ("cohort-24", "stu-c", "Carol", 400),
    ] {
        view.update_entry(ViewEntry::from_student(&student_in(cohort, id, name, xp)));
    }

    let bob = view.get_by_student(&StudentId::new("stu-b")).unwrap();
    assert_eq!(bob.rank, 2, "global rank");
    assert_eq!(bob.cohort_rank, 1, "first in cohort-25");

    let carol = view.get_by_student(&StudentId::new("stu-c")).unwrap();
    assert_eq!(carol.rank, 3);
    assert_eq!(carol.cohort_rank, 2);
}
