// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered bus wrapper.
//!
//! Publishes accumulate in a bounded buffer and are flushed to the
//! underlying bus when the buffer fills or the interval timer fires.
//! A flush attempts every drained event even after a failure; the first
//! error is recorded and returned, failed events are not re-queued.

use crate::bus::EventBus;
use crate::handler::EventHandler;
use async_trait::async_trait;
use hearth_core::{DomainError, DomainEvent, EventType};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BufferedBusConfig {
    /// Flush when this many events are buffered.
    pub capacity: usize,
    /// Flush at least this often regardless of fill.
    pub flush_interval: Duration,
}

impl Default for BufferedBusConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            flush_interval: Duration::from_secs(5),
        }
    }
}

/// Batching wrapper around any [`EventBus`].
///
/// `close` flushes the remaining events once and stops the timer; it does
/// not close the wrapped bus, which may be shared.
pub struct BufferedBus {
    inner: Arc<dyn EventBus>,
    buffer: Mutex<Vec<DomainEvent>>,
    capacity: usize,
    closed: AtomicBool,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedBus {
    /// Wrap `inner` and start the interval flusher.
    pub fn start(inner: Arc<dyn EventBus>, config: BufferedBusConfig) -> Arc<Self> {
        let bus = Arc::new(Self {
            inner,
            buffer: Mutex::new(Vec::new()),
            capacity: config.capacity.max(1),
            closed: AtomicBool::new(false),
            flusher: Mutex::new(None),
        });

        let weak = Arc::downgrade(&bus);
        let interval = config.flush_interval;
        let flusher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(bus) = weak.upgrade() else {
                    break;
                };
                if bus.closed.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(err) = bus.flush().await {
                    warn!(error = %err, "interval flush failed");
                }
            }
        });
        *bus.flusher.lock() = Some(flusher);
        bus
    }

    /// Number of events waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Drain the buffer and publish each event to the wrapped bus.
    ///
    /// Returns the first failure, after attempting every event.
    pub async fn flush(&self) -> Result<(), DomainError> {
        let drained: Vec<DomainEvent> = {
            let mut buffer = self.buffer.lock();
            std::mem::take(&mut *buffer)
        };
        if drained.is_empty() {
            return Ok(());
        }
        debug!(count = drained.len(), "flushing buffered events");

        let mut first_err = None;
        for event in drained {
            if let Err(err) = self.inner.publish(event).await {
                warn!(error = %err, "buffered publish failed");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EventBus for BufferedBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), DomainError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DomainError::Closed);
        }
        let should_flush = {
            let mut buffer = self.buffer.lock();
            buffer.push(event);
            buffer.len() >= self.capacity
        };
        if should_flush {
            self.flush().await?;
        }
        Ok(())
    }

    fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError> {
        self.inner.subscribe(event_type, handler)
    }

    fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), DomainError> {
        self.inner.subscribe_all(handler)
    }

    async fn close(&self) -> Result<(), DomainError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.abort();
        }
        self.flush().await
    }
}

#[cfg(test)]
#[path = "buffered_tests.rs"]
mod tests;
