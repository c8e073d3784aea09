// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus.
//!
//! Async mode fans each handler out onto a bounded worker pool; sync mode
//! awaits handlers inline in registration order. `close` flips the closed
//! flag and then drains the pool, so executions still queued on pool
//! intake observe the flag and drop cleanly.

use crate::bus::EventBus;
use crate::handler::EventHandler;
use async_trait::async_trait;
use hearth_core::{DomainError, DomainEvent, EventType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Local bus tuning.
#[derive(Debug, Clone)]
pub struct LocalBusConfig {
    /// Fan handlers out concurrently instead of awaiting inline.
    pub async_mode: bool,
    /// Worker-pool size for async fan-out.
    pub workers: usize,
}

impl Default for LocalBusConfig {
    fn default() -> Self {
        Self {
            async_mode: true,
            workers: 8,
        }
    }
}

impl LocalBusConfig {
    /// Synchronous delivery: publish returns after all handlers ran.
    pub fn synchronous() -> Self {
        Self {
            async_mode: false,
            workers: 1,
        }
    }
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<EventType, Vec<Arc<dyn EventHandler>>>,
    firehose: Vec<Arc<dyn EventHandler>>,
}

impl Registry {
    /// Handlers for an event: type-specific first, then firehose.
    fn snapshot_for(&self, event_type: &EventType) -> Vec<Arc<dyn EventHandler>> {
        let mut handlers = self.by_type.get(event_type).cloned().unwrap_or_default();
        handlers.extend(self.firehose.iter().cloned());
        handlers
    }
}

/// In-process [`EventBus`].
pub struct LocalBus {
    registry: RwLock<Registry>,
    pool: Arc<Semaphore>,
    config: LocalBusConfig,
    closed: Arc<AtomicBool>,
}

impl LocalBus {
    pub fn new(config: LocalBusConfig) -> Self {
        Self {
            pool: Arc::new(Semaphore::new(config.workers)),
            registry: RwLock::new(Registry::default()),
            config,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            Err(DomainError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(LocalBusConfig::default())
    }
}

#[async_trait]
impl EventBus for LocalBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), DomainError> {
        self.check_open()?;

        // Copy-on-write: snapshot under the lock, execute without it.
        // A handler registered after this point does not observe the event.
        let handlers = self.registry.read().snapshot_for(&event.event_type);
        if handlers.is_empty() {
            debug!(event_type = %event.event_type, "no handlers for event");
            return Ok(());
        }

        if self.config.async_mode {
            let event = Arc::new(event);
            for handler in handlers {
                let pool = Arc::clone(&self.pool);
                let event = Arc::clone(&event);
                let closed = Arc::clone(&self.closed);
                tokio::spawn(async move {
                    let Ok(_permit) = pool.acquire().await else {
                        return;
                    };
                    // Queued while close ran: drop cleanly
                    if closed.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Err(err) = handler.handle(&event).await {
                        warn!(
                            event_type = %event.event_type,
                            error = %err,
                            "async handler failed"
                        );
                    }
                });
            }
            Ok(())
        } else {
            let mut first_err = None;
            for handler in handlers {
                if let Err(err) = handler.handle(&event).await {
                    warn!(
                        event_type = %event.event_type,
                        error = %err,
                        "sync handler failed"
                    );
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
            match first_err {
                Some(crate::handler::HandlerError::Domain(err)) => Err(err),
                Some(err) => Err(DomainError::Fatal(err.to_string())),
                None => Ok(()),
            }
        }
    }

    fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError> {
        self.check_open()?;
        let mut registry = self.registry.write();
        registry.by_type.entry(event_type).or_default().push(handler);
        Ok(())
    }

    fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), DomainError> {
        self.check_open()?;
        let mut registry = self.registry.write();
        registry.firehose.push(handler);
        Ok(())
    }

    async fn close(&self) -> Result<(), DomainError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Wait out in-flight handlers by taking every pool permit.
        if let Ok(permits) = self.pool.acquire_many(self.config.workers as u32).await {
            drop(permits);
        }
        debug!("local bus closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
