// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    network = { DomainError::RetryableNetwork("reset".into()), true },
    timeout = { DomainError::Timeout(Duration::from_secs(5)), true },
    rate_limited = { DomainError::rate_limited(), true },
    unavailable = { DomainError::Unavailable("breaker open".into()), true },
    conflict = { DomainError::Conflict("duplicate login".into()), false },
    integrity = { DomainError::Integrity("null cohort".into()), false },
    not_found = { DomainError::NotFound("stu-1".into()), false },
    remote = { DomainError::NonRetryableRemote("400".into()), false },
    closed = { DomainError::Closed, false },
    fatal = { DomainError::Fatal("panic".into()), false },
)]
fn retryability(err: DomainError, expected: bool) {
    assert_eq!(err.is_retryable(), expected);
}

#[test]
fn display_includes_detail() {
    let err = DomainError::NotFound("student stu-1".into());
    assert_eq!(err.to_string(), "not found: student stu-1");
}

#[test]
fn rate_limited_carries_hint() {
    let err = DomainError::RateLimited {
        retry_after: Some(Duration::from_secs(7)),
    };
    match err {
        DomainError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("unexpected: {other:?}"),
    }
}
