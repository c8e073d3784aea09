// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter queue.
//!
//! A bounded in-memory FIFO of handler-exhausted events. On overflow the
//! oldest entry is evicted. The dispatcher only talks to this type, so a
//! durable adapter can replace it behind the same methods.

use chrono::{DateTime, Utc};
use hearth_core::DomainEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// An event that exhausted its retries for one handler.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub event: DomainEvent,
    pub handler_name: String,
    pub error: String,
    /// Total attempts made (initial try plus retries).
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

/// Bounded FIFO of dead letters.
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Append, evicting the oldest entry if at capacity.
    pub fn push(&self, letter: DeadLetter) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(letter);
    }

    /// Snapshot of current entries, oldest first.
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove and return the oldest entry, for manual redrive.
    pub fn pop_oldest(&self) -> Option<DeadLetter> {
        self.entries.lock().pop_front()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "dlq_tests.rs"]
mod tests;
