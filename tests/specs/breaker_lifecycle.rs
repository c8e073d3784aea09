// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Breaker lifecycle: closed -> open -> half-open -> closed with
//! threshold 3, success threshold 2, one-second open timeout.

use hearth_core::{DomainError, FakeClock};
use hearth_integrations::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
use std::time::Duration;

#[tokio::test]
async fn full_lifecycle() {
    let clock = FakeClock::new();
    let breaker = CircuitBreaker::with_clock(
        "spec",
        BreakerConfig::new(3, 2, Duration::from_secs(1), 1),
        clock.clone(),
    );

    // Three failing calls open the circuit
    for _ in 0..3 {
        let result = breaker
            .execute(|| async { Err::<(), _>(DomainError::RetryableNetwork("down".into())) })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(breaker.state(), BreakerState::Open);

    // An immediate call is rejected without running
    let err = breaker
        .execute(|| async { Ok::<_, DomainError>(()) })
        .await
        .unwrap_err();
    assert_eq!(err, BreakerError::Open);

    // After the open timeout, one call is admitted and succeeds
    clock.advance(Duration::from_millis(1100));
    breaker
        .execute(|| async { Ok::<_, DomainError>(()) })
        .await
        .unwrap();
    assert_eq!(breaker.state(), BreakerState::HalfOpen);

    // A second success closes the circuit
    breaker
        .execute(|| async { Ok::<_, DomainError>(()) })
        .await
        .unwrap();
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[tokio::test]
async fn classified_errors_do_not_open() {
    let clock = FakeClock::new();
    let breaker = CircuitBreaker::with_clock(
        "spec",
        BreakerConfig::new(2, 1, Duration::from_secs(1), 1)
            .with_classifier(|err| !matches!(err, DomainError::NotFound(_))),
        clock,
    );

    for _ in 0..10 {
        let _ = breaker
            .execute(|| async { Err::<(), _>(DomainError::NotFound("student".into())) })
            .await;
    }
    assert_eq!(breaker.state(), BreakerState::Closed);
}
