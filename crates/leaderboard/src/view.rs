// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory denormalized leaderboard view.
//!
//! One reader-writer lock guards the whole projection; every read returns
//! cloned entries, so callers always see a consistent snapshot of the
//! view. Sorting happens on write, and only when XP actually changed.

use crate::entry::{DailyStats, ViewEntry};
use crate::ranking::competition_ranks;
use hearth_core::{LeaderboardSnapshot, PresenceState, Student, StudentId, TaskId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Window of entries around one student.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors<T> {
    pub above: Vec<T>,
    pub current: T,
    pub below: Vec<T>,
}

impl<T> Neighbors<T> {
    pub fn len(&self) -> usize {
        self.above.len() + 1 + self.below.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

const MAX_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct ViewInner {
    entries: HashMap<StudentId, ViewEntry>,
    /// Student ids ordered by XP desc, display name asc.
    sorted: Vec<StudentId>,
    /// Per-cohort id lists in the same order.
    by_cohort: HashMap<String, Vec<StudentId>>,
    online: HashSet<StudentId>,
    /// Task id -> students who completed it (the helper index).
    helper_index: HashMap<TaskId, HashSet<StudentId>>,
    available_helpers: usize,
    version: u64,
}

impl ViewInner {
    fn resort(&mut self) {
        let mut ids: Vec<StudentId> = self.entries.keys().cloned().collect();
        ids.sort_by(|a, b| {
            let ea = &self.entries[a];
            let eb = &self.entries[b];
            eb.xp
                .cmp(&ea.xp)
                .then_with(|| ea.display_name.cmp(&eb.display_name))
        });

        let xps: Vec<u64> = ids.iter().map(|id| self.entries[id].xp).collect();
        for (id, rank) in ids.iter().zip(competition_ranks(&xps)) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.rank = rank;
            }
        }

        self.by_cohort.clear();
        for id in &ids {
            let cohort = self.entries[id].cohort.clone();
            self.by_cohort.entry(cohort).or_default().push(id.clone());
        }
        for cohort_ids in self.by_cohort.values() {
            let xps: Vec<u64> = cohort_ids.iter().map(|id| self.entries[id].xp).collect();
            for (id, rank) in cohort_ids.iter().zip(competition_ranks(&xps)) {
                if let Some(entry) = self.entries.get_mut(id) {
                    entry.cohort_rank = rank;
                }
            }
        }

        self.sorted = ids;
    }

    fn recount_helpers(&mut self) {
        self.available_helpers = self.entries.values().filter(|e| e.is_helper()).count();
    }

    fn collect(&self, ids: &[StudentId]) -> Vec<ViewEntry> {
        ids.iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }
}

/// Thread-safe denormalized projection of the leaderboard.
#[derive(Default)]
pub struct LeaderboardView {
    inner: RwLock<ViewInner>,
}

impl LeaderboardView {
    pub fn new() -> Self {
        Self::default()
    }

    // -- writes -------------------------------------------------------------

    /// Clear the projection and repopulate it from a snapshot.
    ///
    /// Entry cohorts are taken from the snapshot's scope; a following sync
    /// pass refines per-student cohorts on all-cohort snapshots.
    pub fn rebuild_from_snapshot(&self, snapshot: &LeaderboardSnapshot) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.online.clear();
        inner.helper_index.clear();
        for entry in &snapshot.entries {
            let view_entry = ViewEntry::from_snapshot_entry(entry, &snapshot.cohort);
            if view_entry.online {
                inner.online.insert(view_entry.student_id.clone());
            }
            inner.entries.insert(view_entry.student_id.clone(), view_entry);
        }
        inner.resort();
        inner.recount_helpers();
        inner.version += 1;
    }

    /// Insert or replace an entry. Re-sorts only when XP changed.
    pub fn update_entry(&self, entry: ViewEntry) {
        let mut inner = self.inner.write();
        let xp_changed = inner
            .entries
            .get(&entry.student_id)
            .map(|existing| existing.xp != entry.xp)
            .unwrap_or(true);
        if entry.online {
            inner.online.insert(entry.student_id.clone());
        } else {
            inner.online.remove(&entry.student_id);
        }
        inner.entries.insert(entry.student_id.clone(), entry);
        if xp_changed {
            inner.resort();
        }
        inner.recount_helpers();
    }

    /// Merge fresh sync data for a student, preserving view-local fields
    /// (today's stats, streak, achievements, endorsements).
    pub fn upsert_student(&self, student: &Student) {
        let mut inner = self.inner.write();
        let mut entry = ViewEntry::from_student(student);
        if let Some(existing) = inner.entries.get(&student.id) {
            entry.today = existing.today.clone();
            entry.streak = existing.streak;
            entry.achievements = existing.achievements.clone();
            entry.top_endorsements = existing.top_endorsements.clone();
        }
        let xp_changed = inner
            .entries
            .get(&student.id)
            .map(|existing| existing.xp != entry.xp)
            .unwrap_or(true);
        if student.presence == PresenceState::Online {
            inner.online.insert(student.id.clone());
        } else {
            inner.online.remove(&student.id);
        }
        inner.entries.insert(student.id.clone(), entry);
        if xp_changed {
            inner.resort();
        }
        inner.recount_helpers();
    }

    pub fn update_online_status(&self, student_id: &StudentId, online: bool) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(student_id) {
            entry.online = online;
        }
        if online {
            inner.online.insert(student_id.clone());
        } else {
            inner.online.remove(student_id);
        }
    }

    pub fn update_daily_progress(&self, student_id: &StudentId, stats: DailyStats) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(student_id) {
            entry.today = Some(stats);
        }
    }

    pub fn update_help_capability(
        &self,
        student_id: &StudentId,
        available: bool,
        rating: f32,
        help_count: u32,
    ) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(student_id) {
            entry.available_for_help = available;
            entry.helper_rating = rating;
            entry.help_count = help_count;
        }
        inner.recount_helpers();
    }

    pub fn update_streak(&self, student_id: &StudentId, current: u32) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(student_id) {
            entry.streak = current;
        }
    }

    /// Record a task completion in the helper index. Returns false on a
    /// duplicate (student, task) pair.
    pub fn add_task_completion(&self, student_id: &StudentId, task_id: TaskId) -> bool {
        let mut inner = self.inner.write();
        inner
            .helper_index
            .entry(task_id)
            .or_default()
            .insert(student_id.clone())
    }

    // -- reads --------------------------------------------------------------

    pub fn get_top(&self, n: usize) -> Vec<ViewEntry> {
        let inner = self.inner.read();
        let ids = &inner.sorted[..n.min(inner.sorted.len())];
        inner.collect(ids)
    }

    /// Page through the global ranking. Page size clamps into [1, 100];
    /// pages below 1 are treated as 1.
    pub fn get_page(&self, page: usize, size: usize) -> Vec<ViewEntry> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let page = page.max(1);
        let inner = self.inner.read();
        let start = (page - 1).saturating_mul(size).min(inner.sorted.len());
        let end = start.saturating_add(size).min(inner.sorted.len());
        inner.collect(&inner.sorted[start..end])
    }

    pub fn get_by_student(&self, student_id: &StudentId) -> Option<ViewEntry> {
        self.inner.read().entries.get(student_id).cloned()
    }

    /// Window of `k` entries above and below the student within their
    /// cohort, clamped at the bounds.
    pub fn get_neighbors(
        &self,
        student_id: &StudentId,
        k: usize,
    ) -> Option<Neighbors<ViewEntry>> {
        let inner = self.inner.read();
        let entry = inner.entries.get(student_id)?;
        let cohort_ids = inner.by_cohort.get(&entry.cohort)?;
        let pos = cohort_ids.iter().position(|id| id == student_id)?;

        let start = pos.saturating_sub(k);
        let end = (pos + k + 1).min(cohort_ids.len());
        Some(Neighbors {
            above: inner.collect(&cohort_ids[start..pos]),
            current: entry.clone(),
            below: inner.collect(&cohort_ids[pos + 1..end]),
        })
    }

    /// Online students in rank order.
    pub fn get_online(&self) -> Vec<ViewEntry> {
        let inner = self.inner.read();
        inner
            .sorted
            .iter()
            .filter(|id| inner.online.contains(*id))
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    pub fn online_count(&self) -> usize {
        self.inner.read().online.len()
    }

    pub fn available_helpers_count(&self) -> usize {
        self.inner.read().available_helpers
    }

    /// Helpers ordered online-first, then help score, then XP.
    pub fn get_available_helpers(&self) -> Vec<ViewEntry> {
        let inner = self.inner.read();
        let mut helpers: Vec<ViewEntry> = inner
            .entries
            .values()
            .filter(|e| e.is_helper())
            .cloned()
            .collect();
        helpers.sort_by(|a, b| {
            b.online
                .cmp(&a.online)
                .then_with(|| b.help_score().cmp(&a.help_score()))
                .then_with(|| b.xp.cmp(&a.xp))
        });
        helpers
    }

    /// Students who completed a task, ordered online-first,
    /// available-first, then rating, then XP.
    pub fn find_helpers_for_task(&self, task_id: &TaskId) -> Vec<ViewEntry> {
        let inner = self.inner.read();
        let Some(ids) = inner.helper_index.get(task_id) else {
            return Vec::new();
        };
        let mut helpers: Vec<ViewEntry> = ids
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect();
        helpers.sort_by(|a, b| {
            b.online
                .cmp(&a.online)
                .then_with(|| b.available_for_help.cmp(&a.available_for_help))
                .then_with(|| {
                    b.helper_rating
                        .partial_cmp(&a.helper_rating)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.xp.cmp(&a.xp))
        });
        helpers
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Monotonic rebuild counter.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
