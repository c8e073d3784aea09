// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch metrics: per-type counts, durations, retry and failure tallies.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Counters for one event type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMetrics {
    /// Individual handler attempts.
    pub attempts: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Executions that needed at least one retry.
    pub retries: u64,
    /// Executions that succeeded after retrying.
    pub retry_successes: u64,
    /// Executions that exhausted retries.
    pub exhausted: u64,
    pub total_duration: Duration,
}

impl TypeMetrics {
    /// Fraction of attempts that succeeded, in [0, 1].
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.attempts as f64
    }

    pub fn avg_duration(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.attempts as u32
    }
}

/// Shared metrics sink for the dispatcher and metrics middleware.
#[derive(Default)]
pub struct DispatchMetrics {
    per_type: Mutex<HashMap<String, TypeMetrics>>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, event_type: &str, duration: Duration, ok: bool) {
        let mut per_type = self.per_type.lock();
        let entry = per_type.entry(event_type.to_string()).or_default();
        entry.attempts += 1;
        entry.total_duration += duration;
        if ok {
            entry.succeeded += 1;
        } else {
            entry.failed += 1;
        }
    }

    /// An execution finished having used at least one retry.
    pub fn record_retried_execution(&self, event_type: &str, succeeded: bool) {
        let mut per_type = self.per_type.lock();
        let entry = per_type.entry(event_type.to_string()).or_default();
        entry.retries += 1;
        if succeeded {
            entry.retry_successes += 1;
        }
    }

    /// An execution gave up after exhausting its retries.
    pub fn record_exhausted(&self, event_type: &str) {
        let mut per_type = self.per_type.lock();
        per_type.entry(event_type.to_string()).or_default().exhausted += 1;
    }

    pub fn for_type(&self, event_type: &str) -> TypeMetrics {
        self.per_type
            .lock()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> HashMap<String, TypeMetrics> {
        self.per_type.lock().clone()
    }
}
