// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain events published on the bus.
//!
//! Events carry a string type tag (`"student:xp_gained"` style), the id of
//! the aggregate they concern, and a free-form JSON payload. Unknown type
//! tags deserialize to `Custom` so instances running different versions can
//! still route each other's events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Event type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    // -- student --
    StudentRegistered,
    StudentUpdated,
    XpGained,
    LevelUp,

    // -- progress --
    TaskCompleted,
    StreakExtended,
    StreakBroken,
    AchievementUnlocked,

    // -- presence --
    WentOnline,
    WentAway,
    WentOffline,

    // -- leaderboard --
    LeaderboardRebuilt,
    RankChanged,

    // -- notifications --
    DailyDigest,
    HelpRequested,

    /// Unrecognized tag, preserved verbatim.
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::StudentRegistered => "student:registered",
            Self::StudentUpdated => "student:updated",
            Self::XpGained => "student:xp_gained",
            Self::LevelUp => "student:level_up",
            Self::TaskCompleted => "task:completed",
            Self::StreakExtended => "streak:extended",
            Self::StreakBroken => "streak:broken",
            Self::AchievementUnlocked => "achievement:unlocked",
            Self::WentOnline => "presence:went_online",
            Self::WentAway => "presence:went_away",
            Self::WentOffline => "presence:went_offline",
            Self::LeaderboardRebuilt => "leaderboard:rebuilt",
            Self::RankChanged => "leaderboard:rank_changed",
            Self::DailyDigest => "digest:daily",
            Self::HelpRequested => "help:requested",
            Self::Custom(tag) => tag,
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag {
            "student:registered" => Self::StudentRegistered,
            "student:updated" => Self::StudentUpdated,
            "student:xp_gained" => Self::XpGained,
            "student:level_up" => Self::LevelUp,
            "task:completed" => Self::TaskCompleted,
            "streak:extended" => Self::StreakExtended,
            "streak:broken" => Self::StreakBroken,
            "achievement:unlocked" => Self::AchievementUnlocked,
            "presence:went_online" => Self::WentOnline,
            "presence:went_away" => Self::WentAway,
            "presence:went_offline" => Self::WentOffline,
            "leaderboard:rebuilt" => Self::LeaderboardRebuilt,
            "leaderboard:rank_changed" => Self::RankChanged,
            "digest:daily" => Self::DailyDigest,
            "help:requested" => Self::HelpRequested,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from(tag.as_str()))
    }
}

/// Free-form event payload.
pub type EventPayload = HashMap<String, serde_json::Value>;

/// A domain event: type tag, aggregate id, occurrence time, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(event_type: EventType, aggregate_id: impl Into<String>) -> Self {
        Self::at(event_type, aggregate_id, Utc::now())
    }

    /// Create an event with an explicit occurrence time.
    pub fn at(
        event_type: EventType,
        aggregate_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            aggregate_id: aggregate_id.into(),
            occurred_at,
            payload: HashMap::new(),
        }
    }

    /// Attach a payload field (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    pub fn payload_u64(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(|v| v.as_u64())
    }

    pub fn payload_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(|v| v.as_i64())
    }

    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
