// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Student aggregate and helper scoring.

use crate::clock::Clock;
use crate::id::StudentId;
use crate::presence::PresenceState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// XP required per derived level.
pub const XP_PER_LEVEL: u64 = 1000;

/// Lifecycle status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Inactive,
    Left,
}

impl StudentStatus {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Per-student notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub daily_digest: bool,
    pub rank_changes: bool,
    pub achievements: bool,
    pub help_requests: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            daily_digest: true,
            rank_changes: true,
            achievements: true,
            help_requests: true,
        }
    }
}

/// A student as observed from the learning platform plus hub-local state.
///
/// Created by the sync pipeline on first observation; mutated by sync,
/// presence updates, and endorsement aggregation. Principal id and login
/// are unique among active students. XP only decreases with an explicit
/// reason recorded in XP history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// External principal id (chat identity), unique once linked. `None`
    /// until the student connects their chat account.
    pub principal_id: Option<i64>,
    /// Learning-platform login, unique.
    pub login: String,
    pub display_name: String,
    /// Bootcamp intake tag.
    pub cohort: String,
    pub status: StudentStatus,
    pub xp: u64,
    pub presence: PresenceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prefs: NotificationPrefs,
    /// Peer endorsement rating in [0, 5].
    pub helper_rating: f32,
    pub help_count: u32,
    pub available_for_help: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Create a newly-observed student from platform sync data.
    pub fn new(
        id: StudentId,
        principal_id: Option<i64>,
        login: impl Into<String>,
        display_name: impl Into<String>,
        cohort: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now_utc();
        Self {
            id,
            principal_id,
            login: login.into(),
            display_name: display_name.into(),
            cohort: cohort.into(),
            status: StudentStatus::Active,
            xp: 0,
            presence: PresenceState::Offline,
            last_seen_at: None,
            last_synced_at: Some(now),
            prefs: NotificationPrefs::default(),
            helper_rating: 0.0,
            help_count: 0,
            available_for_help: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived level: `xp / 1000`, integer floor.
    pub fn level(&self) -> u32 {
        (self.xp / XP_PER_LEVEL) as u32
    }

    /// Combined helper score; see [`help_score`].
    pub fn help_score(&self) -> u32 {
        help_score(self.helper_rating, self.help_count)
    }

    /// Whether this student counts as a helper: flagged available with a
    /// non-zero help count.
    pub fn is_helper(&self) -> bool {
        self.available_for_help && self.help_count > 0
    }
}

/// Helper score: `min(rating * 10, 50) + min(help_count, 50)`.
///
/// Rating contributes at most 50 points, volume at most 50, so a perfect
/// rating cannot outweigh never actually helping.
pub fn help_score(rating: f32, help_count: u32) -> u32 {
    let rating_part = (rating * 10.0).clamp(0.0, 50.0) as u32;
    let count_part = help_count.min(50);
    rating_part + count_part
}

#[cfg(test)]
#[path = "student_tests.rs"]
mod tests;
