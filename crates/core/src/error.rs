// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds for recoverable failures.
//!
//! Every surface maps its failures into these kinds so the dispatcher can
//! apply one retry policy: retryable-network, timeout, rate-limited, and
//! unavailable are retried with backoff; conflict and integrity never are.

use std::time::Duration;
use thiserror::Error;

/// Classified failure, carried by `Result` throughout the workspace.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The bus or connection has been shut down.
    #[error("closed")]
    Closed,

    /// Dependency is down or a breaker is open.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Transient transport fault worth retrying.
    #[error("network error: {0}")]
    RetryableNetwork(String),

    /// Remote rejected the request (4xx); retrying cannot help.
    #[error("remote rejected request: {0}")]
    NonRetryableRemote(String),

    #[error("rate limited")]
    RateLimited {
        /// Server-provided hint, if any.
        retry_after: Option<Duration>,
    },

    /// Unique or foreign-key violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Not-null or check constraint violation.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Recovered programming error (panic).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl DomainError {
    /// Whether the dispatcher should retry this failure with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RetryableNetwork(_)
                | Self::Timeout(_)
                | Self::RateLimited { .. }
                | Self::Unavailable(_)
        )
    }

    /// Shorthand for a rate-limit failure without a hint.
    pub fn rate_limited() -> Self {
        Self::RateLimited { retry_after: None }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
