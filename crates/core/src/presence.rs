// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence state and records.
//!
//! State is always derived from last-seen age, never stored as a source of
//! truth: online under the online TTL, away under the away TTL, offline
//! beyond that (the record itself expires with the away TTL).

use crate::id::{StudentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Derived presence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Online,
    Away,
    Offline,
}

impl PresenceState {
    /// Derive state from last-seen age.
    pub fn from_age(age: Duration, online_ttl: Duration, away_ttl: Duration) -> Self {
        if age < online_ttl {
            Self::Online
        } else if age < away_ttl {
            Self::Away
        } else {
            Self::Offline
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// TTL-governed presence record, stored under `online:{student}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub student_id: StudentId,
    pub display_name: String,
    pub state: PresenceState,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<TaskId>,
    #[serde(default)]
    pub available_for_help: bool,
    pub session_started_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Minimal record for a student first seen via heartbeat.
    pub fn minimal(student_id: StudentId, now: DateTime<Utc>) -> Self {
        Self {
            student_id,
            display_name: String::new(),
            state: PresenceState::Online,
            last_seen_at: now,
            current_task: None,
            available_for_help: false,
            session_started_at: now,
        }
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
