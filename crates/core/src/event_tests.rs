// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    xp_gained = { EventType::XpGained, "student:xp_gained" },
    went_online = { EventType::WentOnline, "presence:went_online" },
    rebuilt = { EventType::LeaderboardRebuilt, "leaderboard:rebuilt" },
    digest = { EventType::DailyDigest, "digest:daily" },
)]
fn type_tag_round_trip(event_type: EventType, tag: &str) {
    assert_eq!(event_type.as_str(), tag);
    assert_eq!(EventType::from(tag), event_type);
}

#[test]
fn unknown_tag_becomes_custom() {
    let parsed = EventType::from("experiment:banana");
    assert_eq!(parsed, EventType::Custom("experiment:banana".to_string()));
    assert_eq!(parsed.as_str(), "experiment:banana");
}

#[test]
fn event_type_serde_as_string() {
    let json = serde_json::to_string(&EventType::TaskCompleted).unwrap();
    assert_eq!(json, "\"task:completed\"");

    let parsed: EventType = serde_json::from_str("\"task:completed\"").unwrap();
    assert_eq!(parsed, EventType::TaskCompleted);

    let custom: EventType = serde_json::from_str("\"new:thing\"").unwrap();
    assert_eq!(custom, EventType::Custom("new:thing".to_string()));
}

#[test]
fn event_builder_payload() {
    let event = DomainEvent::new(EventType::XpGained, "stu-1")
        .with("old_xp", 100)
        .with("new_xp", 250)
        .with("login", "amartin");

    assert_eq!(event.aggregate_id, "stu-1");
    assert_eq!(event.payload_u64("old_xp"), Some(100));
    assert_eq!(event.payload_u64("new_xp"), Some(250));
    assert_eq!(event.payload_str("login"), Some("amartin"));
    assert_eq!(event.payload_str("missing"), None);
}

#[test]
fn event_serde_round_trip() {
    let event = DomainEvent::new(EventType::WentOnline, "stu-7").with("task", "checkpoint-01");
    let json = serde_json::to_string(&event).unwrap();
    let parsed: DomainEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn event_without_payload_omits_field() {
    let event = DomainEvent::new(EventType::WentOffline, "stu-7");
    let json = serde_json::to_string(&event).unwrap();
    assert!(!json.contains("payload"), "empty payload serialized: {json}");
}
