// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence transitions driven by the fake clock: online under the
//! online TTL, away under the away TTL, gone after that.

use hearth_core::{FakeClock, PresenceState, StudentId};
use hearth_presence::{OnlineInfo, PresenceConfig, PresenceTracker};
use hearth_store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

const ONLINE_TTL: Duration = Duration::from_secs(300);
const AWAY_TTL: Duration = Duration::from_secs(1800);

fn tracker(clock: &FakeClock) -> PresenceTracker<FakeClock> {
    PresenceTracker::with_clock(
        Arc::new(MemoryStore::with_clock(clock.clone())),
        PresenceConfig {
            online_ttl: ONLINE_TTL,
            away_ttl: AWAY_TTL,
        },
        clock.clone(),
    )
}

#[tokio::test]
async fn ttl_ladder() {
    let clock = FakeClock::new();
    let tracker = tracker(&clock);
    let id = StudentId::new("stu-1");

    tracker
        .set_online(OnlineInfo {
            student_id: id.clone(),
            display_name: "Alice".into(),
            current_task: None,
            available_for_help: true,
        })
        .await
        .unwrap();

    // One second later: online, counted
    clock.advance(Duration::from_secs(1));
    assert_eq!(tracker.get_state(&id).await.unwrap(), PresenceState::Online);
    assert!(tracker.count_online().await.unwrap() >= 1);

    // Past the online TTL: away
    clock.advance(ONLINE_TTL);
    assert_eq!(tracker.get_state(&id).await.unwrap(), PresenceState::Away);

    // Past the away TTL: the record itself is gone
    clock.advance(AWAY_TTL);
    assert_eq!(tracker.get_state(&id).await.unwrap(), PresenceState::Offline);
    assert!(tracker.get_all_online().await.unwrap().is_empty());
}

#[tokio::test]
async fn online_then_offline_round_trip() {
    let clock = FakeClock::new();
    let tracker = tracker(&clock);
    let id = StudentId::new("stu-1");

    tracker
        .set_online(OnlineInfo {
            student_id: id.clone(),
            display_name: "Alice".into(),
            current_task: None,
            available_for_help: false,
        })
        .await
        .unwrap();
    tracker.set_offline(&id).await.unwrap();

    assert_eq!(tracker.get_state(&id).await.unwrap(), PresenceState::Offline);
}
