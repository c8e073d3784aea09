// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by store implementations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure; worth retrying for idempotent callers.
    #[error("store connection error: {0}")]
    Connection(String),

    /// The store answered with something unexpected.
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// A stored value could not be decoded.
    #[error("store decode error: {0}")]
    Decode(String),

    #[error("store closed")]
    Closed,
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connection(err.to_string())
        } else if err.kind() == redis::ErrorKind::TypeError {
            Self::Decode(err.to_string())
        } else {
            Self::Protocol(err.to_string())
        }
    }
}
