// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    rate_limited = { 429, true },
    bad_request = { 400, false },
    not_found = { 404, false },
    server_error = { 500, true },
    bad_gateway = { 502, true },
)]
fn status_classification_retryability(status: u16, retryable: bool) {
    let err = classify_status(status, None, "body");
    assert_eq!(err.is_retryable(), retryable, "status {status}: {err:?}");
}

#[test]
fn rate_limit_carries_hint() {
    let err = classify_status(429, Some(Duration::from_secs(30)), "slow down");
    assert_eq!(
        err,
        DomainError::RateLimited {
            retry_after: Some(Duration::from_secs(30))
        }
    );
}

#[parameterized(
    plain = { Some("7"), Some(7) },
    padded = { Some(" 12 "), Some(12) },
    missing = { None, None },
    http_date = { Some("Wed, 21 Oct 2026 07:28:00 GMT"), None },
    junk = { Some("soon"), None },
)]
fn retry_after_parsing(value: Option<&str>, expected_secs: Option<u64>) {
    assert_eq!(
        parse_retry_after(value),
        expected_secs.map(Duration::from_secs)
    );
}

#[test]
fn progress_deserializes_with_defaults() {
    let progress: PlatformProgress = serde_json::from_value(serde_json::json!({
        "login": "amartin",
        "xp": 1200,
        "completed_tasks": [
            {"id": "task-1", "name": "Graphs", "xp": 100, "completed_at": "2026-03-02T10:00:00Z"},
            {"id": "task-2", "name": "Trees", "completed_at": null}
        ]
    }))
    .unwrap();

    assert_eq!(progress.login, "amartin");
    assert_eq!(progress.display_name, "");
    assert_eq!(progress.cohort, None);
    assert_eq!(progress.completed_tasks.len(), 2);
    assert_eq!(progress.completed_tasks[0].xp, 100);
    assert_eq!(progress.completed_tasks[1].xp, 0);
    assert!(progress.completed_tasks[1].completed_at.is_none());
}

#[test]
fn client_rejects_nothing_at_construction() {
    // Even an empty base URL builds; requests fail later with real errors
    let client = PlatformClient::new(PlatformConfig::default()).unwrap();
    assert_eq!(client.breaker().state(), crate::breaker::BreakerState::Closed);
}

#[tokio::test]
async fn response_cache_round_trip() {
    let client = PlatformClient::new(PlatformConfig::default()).unwrap();
    let value = serde_json::json!({"login": "amartin", "xp": 42});

    assert!(client.cached("students/amartin/progress").is_none());
    client.store_cached("students/amartin/progress", &value);
    assert_eq!(client.cached("students/amartin/progress"), Some(value));

    client.invalidate_cache();
    assert!(client.cached("students/amartin/progress").is_none());
}

#[tokio::test]
async fn response_cache_expires_with_clock() {
    let clock = hearth_core::FakeClock::new();
    let client = PlatformClient::with_clock(
        PlatformConfig {
            cache_ttl: Duration::from_secs(60),
            ..PlatformConfig::default()
        },
        BreakerConfig::platform_api(),
        clock.clone(),
    )
    .unwrap();

    client.store_cached("p", &serde_json::json!(1));
    assert!(client.cached("p").is_some());

    clock.advance(Duration::from_secs(61));
    assert!(client.cached("p").is_none());
}
