// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const ONLINE: Duration = Duration::from_secs(300);
const AWAY: Duration = Duration::from_secs(1800);

#[parameterized(
    fresh = { 0, PresenceState::Online },
    just_under_online = { 299, PresenceState::Online },
    at_online_ttl = { 300, PresenceState::Away },
    mid_away = { 900, PresenceState::Away },
    just_under_away = { 1799, PresenceState::Away },
    at_away_ttl = { 1800, PresenceState::Offline },
    long_gone = { 86_400, PresenceState::Offline },
)]
fn state_from_age(age_secs: u64, expected: PresenceState) {
    let age = Duration::from_secs(age_secs);
    assert_eq!(PresenceState::from_age(age, ONLINE, AWAY), expected);
}

#[test]
fn display_lowercase() {
    assert_eq!(PresenceState::Online.to_string(), "online");
    assert_eq!(PresenceState::Away.to_string(), "away");
    assert_eq!(PresenceState::Offline.to_string(), "offline");
}

#[test]
fn record_serde_round_trip() {
    let now = Utc::now();
    let record = PresenceRecord {
        student_id: StudentId::new("stu-1"),
        display_name: "Alice".into(),
        state: PresenceState::Online,
        last_seen_at: now,
        current_task: Some(TaskId::new("task-3")),
        available_for_help: true,
        session_started_at: now,
    };

    let json = serde_json::to_string(&record).unwrap();
    let parsed: PresenceRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn minimal_record_is_online_now() {
    let now = Utc::now();
    let record = PresenceRecord::minimal(StudentId::new("stu-2"), now);
    assert_eq!(record.state, PresenceState::Online);
    assert_eq!(record.last_seen_at, now);
    assert_eq!(record.session_started_at, now);
    assert!(record.current_task.is_none());
}
