// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-instance event bus.
//!
//! Wraps a local bus and the store's pub/sub channel. Publishing
//! broadcasts an envelope to every instance and delivers locally in the
//! same call; the receive loop republishes foreign envelopes onto the
//! local bus and drops our own. Delivery across instances is best-effort:
//! a broadcast failure is logged, not surfaced, and local delivery still
//! happens.

use crate::bus::EventBus;
use crate::handler::EventHandler;
use crate::local::LocalBus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::event::EventPayload;
use hearth_core::{DomainError, DomainEvent, EventType, InstanceId};
use hearth_store::Store;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default pub/sub channel for domain events.
pub const EVENTS_CHANNEL: &str = "hearth:events";

/// Wire form of a cross-instance event. Timestamps are ISO-8601 UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub instance_id: InstanceId,
    pub event_type: EventType,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

impl Envelope {
    pub fn wrap(instance_id: InstanceId, event: &DomainEvent) -> Self {
        Self {
            instance_id,
            event_type: event.event_type.clone(),
            aggregate_id: event.aggregate_id.clone(),
            occurred_at: event.occurred_at,
            payload: event.payload.clone(),
        }
    }

    pub fn into_event(self) -> DomainEvent {
        DomainEvent {
            event_type: self.event_type,
            aggregate_id: self.aggregate_id,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// Unique-enough id for a live instance: monotonic nanos plus a random
/// suffix. Only needs to differ among concurrently-running instances.
pub fn default_instance_id() -> InstanceId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let suffix = uuid::Uuid::new_v4();
    InstanceId::new(format!("hearth-{nanos:x}-{}", suffix.simple()))
}

/// Cross-instance [`EventBus`] over a [`Store`] pub/sub channel.
pub struct InstanceBus {
    local: Arc<LocalBus>,
    store: Arc<dyn Store>,
    channel: String,
    instance_id: InstanceId,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl InstanceBus {
    /// Subscribe to the channel and start the receive loop.
    pub async fn start(
        local: Arc<LocalBus>,
        store: Arc<dyn Store>,
        channel: impl Into<String>,
        instance_id: Option<InstanceId>,
    ) -> Result<Arc<Self>, DomainError> {
        let channel = channel.into();
        let instance_id = instance_id.unwrap_or_else(default_instance_id);

        let mut rx = store
            .subscribe(&channel)
            .await
            .map_err(|e| DomainError::Unavailable(e.to_string()))?;

        let bus = Arc::new(Self {
            local: Arc::clone(&local),
            store,
            channel: channel.clone(),
            instance_id: instance_id.clone(),
            listener: Mutex::new(None),
        });

        let listener = {
            let local = local;
            let own_id = instance_id;
            tokio::spawn(async move {
                while let Some(bytes) = rx.recv().await {
                    let envelope: Envelope = match serde_json::from_slice(&bytes) {
                        Ok(env) => env,
                        Err(err) => {
                            warn!(error = %err, "undecodable event envelope");
                            continue;
                        }
                    };
                    if envelope.instance_id == own_id {
                        continue;
                    }
                    debug!(
                        origin = %envelope.instance_id,
                        event_type = %envelope.event_type,
                        "received cross-instance event"
                    );
                    if let Err(err) = local.publish(envelope.into_event()).await {
                        // Closed just means we are shutting down
                        if err != DomainError::Closed {
                            warn!(error = %err, "failed to republish foreign event");
                        }
                    }
                }
                debug!("cross-instance receive loop finished");
            })
        };
        *bus.listener.lock() = Some(listener);
        Ok(bus)
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }
}

#[async_trait]
impl EventBus for InstanceBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), DomainError> {
        let envelope = Envelope::wrap(self.instance_id.clone(), &event);
        match serde_json::to_vec(&envelope) {
            Ok(bytes) => {
                if let Err(err) = self.store.publish(&self.channel, bytes).await {
                    warn!(error = %err, "event broadcast failed; delivering locally only");
                }
            }
            Err(err) => warn!(error = %err, "unserializable event envelope"),
        }
        self.local.publish(event).await
    }

    fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError> {
        self.local.subscribe(event_type, handler)
    }

    fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), DomainError> {
        self.local.subscribe_all(handler)
    }

    async fn close(&self) -> Result<(), DomainError> {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        self.local.close().await
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
