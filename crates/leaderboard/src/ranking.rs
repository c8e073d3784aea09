// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live ranking construction.
//!
//! Ordering is XP descending with display-name-ascending tie-break; ranks
//! are competition style (1 2 2 4): tied XP shares a rank, the next
//! distinct value takes the 1-based index of its first holder.

use chrono::{DateTime, Utc};
use hearth_core::{
    LeaderboardSnapshot, PresenceState, SnapshotEntry, SnapshotId, Student, ALL_COHORTS,
};

/// Competition ranks for a descending-sorted score list.
pub fn competition_ranks(scores: &[u64]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(scores.len());
    for (i, score) in scores.iter().enumerate() {
        if i > 0 && *score == scores[i - 1] {
            // Same score shares the previous rank
            let prev = ranks[i - 1];
            ranks.push(prev);
        } else {
            ranks.push(i as u32 + 1);
        }
    }
    ranks
}

/// Order active students and assign competition ranks.
///
/// `cohort = None` ranks everyone; `Some(tag)` restricts to one cohort.
pub fn rank_students(students: Vec<Student>, cohort: Option<&str>) -> Vec<SnapshotEntry> {
    let mut students: Vec<Student> = students
        .into_iter()
        .filter(|s| s.status.is_active())
        .filter(|s| cohort.is_none_or(|c| s.cohort == c))
        .collect();
    students.sort_by(|a, b| {
        b.xp.cmp(&a.xp)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let xps: Vec<u64> = students.iter().map(|s| s.xp).collect();
    let ranks = competition_ranks(&xps);

    students
        .into_iter()
        .zip(ranks)
        .map(|(s, rank)| SnapshotEntry {
            rank,
            xp: s.xp,
            level: s.level(),
            rank_change: 0,
            online: s.presence == PresenceState::Online,
            available_for_help: s.available_for_help,
            helper_rating: s.helper_rating,
            help_count: s.help_count,
            login: s.login,
            display_name: s.display_name,
            student_id: s.id,
        })
        .collect()
}

/// Fill in rank movement relative to a previous snapshot.
///
/// Positive change means the student climbed. Students absent from the
/// previous snapshot keep change 0.
pub fn apply_rank_changes(entries: &mut [SnapshotEntry], previous: &LeaderboardSnapshot) {
    for entry in entries.iter_mut() {
        if let Some(prev) = previous.entry_for(&entry.student_id) {
            entry.rank_change = prev.rank as i32 - entry.rank as i32;
        }
    }
}

/// Materialize a snapshot: rank, diff against the previous snapshot,
/// compute totals.
pub fn build_snapshot(
    id: SnapshotId,
    cohort: Option<&str>,
    students: Vec<Student>,
    previous: Option<&LeaderboardSnapshot>,
    taken_at: DateTime<Utc>,
) -> LeaderboardSnapshot {
    let mut entries = rank_students(students, cohort);
    if let Some(previous) = previous {
        apply_rank_changes(&mut entries, previous);
    }
    LeaderboardSnapshot::from_entries(
        id,
        cohort.unwrap_or(ALL_COHORTS),
        taken_at,
        entries,
    )
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
mod tests;
