// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstractions for testable time.
//!
//! Monotonic time (`Instant`) drives TTLs, breaker timeouts, and backoff;
//! wall-clock time (`DateTime<Utc>`) stamps domain records. Both come from
//! the same clock so a `FakeClock` advance moves them in lockstep.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant, for interval arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock timestamp, for domain records and wire formats.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for tests.
///
/// Starts at a fixed epoch (2026-01-01T00:00:00Z) and only moves when
/// [`FakeClock::advance`] is called. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct FakeClock {
    start: Instant,
    epoch: DateTime<Utc>,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        // Timestamp construction from a constant cannot fail
        let epoch = Utc
            .timestamp_opt(1_767_225_600, 0) // 2026-01-01T00:00:00Z
            .single()
            .unwrap_or_else(Utc::now);
        Self::at(epoch)
    }

    /// Create a fake clock whose wall-clock side starts at `epoch`.
    pub fn at(epoch: DateTime<Utc>) -> Self {
        Self {
            start: Instant::now(),
            epoch,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move both monotonic and wall-clock time forward by `d`.
    pub fn advance(&self, d: Duration) {
        let mut offset = self.offset.lock();
        *offset += d;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let offset = *self.offset.lock();
        let offset = chrono::Duration::from_std(offset)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        self.epoch + offset
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
