// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress tracking: XP history, daily grinds, streaks, task completions.

use crate::id::{StudentId, TaskId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of an XP change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpHistoryEntry {
    pub student_id: StudentId,
    pub old_xp: u64,
    pub new_xp: u64,
    pub delta: i64,
    /// Why XP changed. Required for decreases.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub recorded_at: DateTime<Utc>,
}

impl XpHistoryEntry {
    pub fn new(
        student_id: StudentId,
        old_xp: u64,
        new_xp: u64,
        reason: impl Into<String>,
        task_id: Option<TaskId>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            old_xp,
            new_xp,
            delta: new_xp as i64 - old_xp as i64,
            reason: reason.into(),
            task_id,
            recorded_at,
        }
    }
}

/// One student's activity bucket for one local calendar day.
///
/// Created on the first activity of the day, upserted on every activity
/// after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGrind {
    pub student_id: StudentId,
    /// Local calendar day in the configured timezone.
    pub day: NaiveDate,
    pub xp_start: u64,
    pub xp_current: u64,
    pub xp_gained: u64,
    pub tasks_completed: u32,
    pub session_count: u32,
    pub session_minutes: u32,
    pub first_activity_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_current: Option<u32>,
    pub rank_change: i32,
    /// Index of this day within the current streak (1-based).
    pub streak_day: u32,
}

impl DailyGrind {
    /// Open a grind on the first activity of the day.
    pub fn open(
        student_id: StudentId,
        day: NaiveDate,
        xp: u64,
        rank: Option<u32>,
        streak_day: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            day,
            xp_start: xp,
            xp_current: xp,
            xp_gained: 0,
            tasks_completed: 0,
            session_count: 1,
            session_minutes: 0,
            first_activity_at: now,
            last_activity_at: now,
            rank_start: rank,
            rank_current: rank,
            rank_change: 0,
            streak_day,
        }
    }

    /// Fold a new observation into the grind.
    pub fn record_activity(&mut self, xp: u64, rank: Option<u32>, now: DateTime<Utc>) {
        self.xp_current = xp;
        self.xp_gained = self.xp_current.saturating_sub(self.xp_start);
        self.rank_current = rank.or(self.rank_current);
        self.rank_change = match (self.rank_start, self.rank_current) {
            // Positive change = climbed (rank number went down)
            (Some(start), Some(current)) => start as i32 - current as i32,
            _ => 0,
        };
        self.last_activity_at = now;
    }

    pub fn record_task_completed(&mut self) {
        self.tasks_completed += 1;
    }
}

/// Outcome of folding a day's activity into a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// First tracked day or streak restarted after a gap.
    Started,
    /// Consecutive day, streak grew.
    Extended,
    /// Same day as the last activity, nothing changed.
    Unchanged,
}

/// Consecutive-day activity counter. Invariant: `current <= best`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub student_id: StudentId,
    pub current: u32,
    pub best: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_day: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<NaiveDate>,
}

impl Streak {
    pub fn new(student_id: StudentId) -> Self {
        Self {
            student_id,
            current: 0,
            best: 0,
            last_active_day: None,
            started_on: None,
        }
    }

    /// Record activity on a local calendar day.
    pub fn record_activity(&mut self, day: NaiveDate) -> StreakOutcome {
        let outcome = match self.last_active_day {
            Some(last) if last == day => return StreakOutcome::Unchanged,
            Some(last) if last.succ_opt() == Some(day) => {
                self.current += 1;
                StreakOutcome::Extended
            }
            _ => {
                self.current = 1;
                self.started_on = Some(day);
                StreakOutcome::Started
            }
        };
        self.best = self.best.max(self.current);
        self.last_active_day = Some(day);
        outcome
    }

    /// Whether a streak standing at `today` has been broken (no activity
    /// yesterday or today).
    pub fn is_broken_as_of(&self, today: NaiveDate) -> bool {
        match self.last_active_day {
            Some(last) => last < today && last.succ_opt() != Some(today),
            None => false,
        }
    }
}

/// A completed platform task. Unique per (student, task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub student_id: StudentId,
    pub task_id: TaskId,
    pub task_name: String,
    pub xp_earned: u64,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
