// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Denormalized view entries.

use hearth_core::{help_score, PresenceState, SnapshotEntry, Student, StudentId};
use serde::{Deserialize, Serialize};

/// Today's activity, merged into the view from the daily grind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub xp_gained: u64,
    pub tasks_completed: u32,
    pub streak_day: u32,
}

/// Everything the read surfaces need about one student, denormalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub student_id: StudentId,
    pub login: String,
    pub display_name: String,
    pub cohort: String,
    /// Global competition rank; 0 until the first sort.
    pub rank: u32,
    /// Rank within the cohort sub-list.
    pub cohort_rank: u32,
    pub xp: u64,
    pub level: u32,
    pub online: bool,
    pub available_for_help: bool,
    pub helper_rating: f32,
    pub help_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<DailyStats>,
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub achievements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_endorsements: Vec<String>,
}

impl ViewEntry {
    pub fn from_student(student: &Student) -> Self {
        Self {
            student_id: student.id.clone(),
            login: student.login.clone(),
            display_name: student.display_name.clone(),
            cohort: student.cohort.clone(),
            rank: 0,
            cohort_rank: 0,
            xp: student.xp,
            level: student.level(),
            online: student.presence == PresenceState::Online,
            available_for_help: student.available_for_help,
            helper_rating: student.helper_rating,
            help_count: student.help_count,
            today: None,
            streak: 0,
            achievements: Vec::new(),
            top_endorsements: Vec::new(),
        }
    }

    pub fn from_snapshot_entry(entry: &SnapshotEntry, cohort: &str) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            login: entry.login.clone(),
            display_name: entry.display_name.clone(),
            cohort: cohort.to_string(),
            rank: entry.rank,
            cohort_rank: 0,
            xp: entry.xp,
            level: entry.level,
            online: entry.online,
            available_for_help: entry.available_for_help,
            helper_rating: entry.helper_rating,
            help_count: entry.help_count,
            today: None,
            streak: 0,
            achievements: Vec::new(),
            top_endorsements: Vec::new(),
        }
    }

    pub fn help_score(&self) -> u32 {
        help_score(self.helper_rating, self.help_count)
    }

    /// A helper is flagged available with a non-zero help count.
    pub fn is_helper(&self) -> bool {
        self.available_for_help && self.help_count > 0
    }
}
