// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The events-substrate capability.

use crate::handler::EventHandler;
use async_trait::async_trait;
use hearth_core::{DomainError, DomainEvent, EventType};
use std::sync::Arc;

/// Publish/subscribe capability over domain events.
///
/// Implementations: [`crate::LocalBus`] (in-process),
/// [`crate::InstanceBus`] (cross-instance), [`crate::BufferedBus`]
/// (batching wrapper). Handlers reference the bus only through this
/// trait, injected at wiring time, so repositories that publish back
/// onto the bus never own it.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event. Non-blocking in async mode; synchronous mode
    /// returns after all handlers complete. Fails with
    /// [`DomainError::Closed`] after [`EventBus::close`].
    async fn publish(&self, event: DomainEvent) -> Result<(), DomainError>;

    /// Add a handler for one event type. Idempotent addition.
    fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError>;

    /// Add a firehose handler observing every event.
    fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), DomainError>;

    /// Shut the bus. Blocks until in-flight async handlers finish;
    /// queued executions are dropped cleanly.
    async fn close(&self) -> Result<(), DomainError>;
}
