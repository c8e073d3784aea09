// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatcher: retries, timeouts, middleware, dead letters.
//!
//! The dispatcher subscribes to a bus as a firehose handler and routes
//! each event to its registered handlers. Every execution acquires a slot
//! on a bounded pool, runs the middleware chain with a per-attempt
//! timeout, and retries with exponential backoff until the registration's
//! budget is spent; exhausted executions land in the dead-letter queue.
//!
//! Sync registrations run inline and their failures are aggregated into
//! the dispatch result; async registrations are spawned and their
//! failures only logged.

use crate::dlq::{DeadLetter, DeadLetterQueue};
use crate::handler::{EventHandler, HandlerError};
use crate::metrics::DispatchMetrics;
use crate::middleware::{HandlerContext, Middleware, Next};
use async_trait::async_trait;
use chrono::Utc;
use hearth_core::{DomainError, DomainEvent, EventType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Exponential backoff settings for one registration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before the given attempt (1-based):
    /// `initial * multiplier^(attempt-1)`, capped at `max_backoff`.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

/// One handler hooked to one event type.
pub struct HandlerRegistration {
    pub name: String,
    pub handler: Arc<dyn EventHandler>,
    /// Spawned instead of awaited; failures logged, not surfaced.
    pub is_async: bool,
    pub retry: RetryPolicy,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl HandlerRegistration {
    pub fn new(name: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            is_async: false,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Worker-pool slots shared by all executions.
    pub workers: usize,
    /// Dead-letter queue capacity; `None` disables the DLQ.
    pub dlq_capacity: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            dlq_capacity: Some(1000),
        }
    }
}

/// Sync-handler failures for one dispatched event.
#[derive(Debug, Error)]
#[error("{} of {total} handler(s) failed for {event_type}", failures.len())]
pub struct DispatchError {
    pub event_type: String,
    pub total: usize,
    pub failures: Vec<(String, HandlerError)>,
}

impl DispatchError {
    fn detail(&self) -> String {
        self.failures
            .iter()
            .map(|(name, err)| format!("{name}: {err}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The retry/middleware layer above the event bus.
pub struct Dispatcher {
    registry: RwLock<HashMap<EventType, Vec<Arc<HandlerRegistration>>>>,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    pool: Arc<Semaphore>,
    dlq: Option<Arc<DeadLetterQueue>>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            middlewares: RwLock::new(Vec::new()),
            pool: Arc::new(Semaphore::new(config.workers.max(1))),
            dlq: config.dlq_capacity.map(|cap| Arc::new(DeadLetterQueue::new(cap))),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Append a middleware. First added is outermost at execution time.
    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares.write().push(middleware);
    }

    pub fn register(&self, event_type: EventType, registration: HandlerRegistration) {
        let mut registry = self.registry.write();
        registry
            .entry(event_type)
            .or_default()
            .push(Arc::new(registration));
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn dead_letters(&self) -> Option<Arc<DeadLetterQueue>> {
        self.dlq.clone()
    }

    /// Hook a dispatcher to a bus as a firehose subscriber.
    pub fn attach(
        dispatcher: &Arc<Self>,
        bus: &dyn crate::bus::EventBus,
    ) -> Result<(), DomainError> {
        bus.subscribe_all(Arc::clone(dispatcher) as Arc<dyn EventHandler>)
    }

    /// Route one event to its registered handlers.
    pub async fn dispatch(&self, event: &DomainEvent) -> Result<(), DispatchError> {
        // Copy-on-write registry snapshot; executed without the lock held
        let regs = self
            .registry
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();
        if regs.is_empty() {
            debug!(event_type = %event.event_type, "no registrations");
            return Ok(());
        }
        let middlewares = self.middlewares.read().clone();
        let event = Arc::new(event.clone());
        let total = regs.len();
        let mut failures = Vec::new();

        for reg in regs {
            if reg.is_async {
                let middlewares = middlewares.clone();
                let pool = Arc::clone(&self.pool);
                let dlq = self.dlq.clone();
                let metrics = Arc::clone(&self.metrics);
                let event = Arc::clone(&event);
                tokio::spawn(async move {
                    if let Err(err) =
                        Self::execute(reg, middlewares, pool, dlq, metrics, event).await
                    {
                        warn!(error = %err, "async registration failed");
                    }
                });
            } else {
                let name = reg.name.clone();
                if let Err(err) = Self::execute(
                    reg,
                    middlewares.clone(),
                    Arc::clone(&self.pool),
                    self.dlq.clone(),
                    Arc::clone(&self.metrics),
                    Arc::clone(&event),
                )
                .await
                {
                    failures.push((name, err));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError {
                event_type: event.event_type.as_str().to_string(),
                total,
                failures,
            })
        }
    }

    /// Run one registration to completion: pool slot, middleware chain,
    /// per-attempt timeout, retry loop, dead-lettering on exhaustion.
    async fn execute(
        reg: Arc<HandlerRegistration>,
        middlewares: Vec<Arc<dyn Middleware>>,
        pool: Arc<Semaphore>,
        dlq: Option<Arc<DeadLetterQueue>>,
        metrics: Arc<DispatchMetrics>,
        event: Arc<DomainEvent>,
    ) -> Result<(), HandlerError> {
        let _permit = pool
            .acquire_owned()
            .await
            .map_err(|_| HandlerError::Domain(DomainError::Closed))?;

        let event_type = event.event_type.as_str().to_string();
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(reg.retry.backoff_before(attempt)).await;
            }
            let ctx = HandlerContext {
                handler_name: reg.name.clone(),
                attempt,
            };
            let chain = Next::new(&middlewares, reg.handler.as_ref());
            let result = match tokio::time::timeout(reg.timeout, chain.run(&ctx, &event)).await {
                Ok(result) => result,
                // The losing branch of the race is dropped; the handler is
                // abandoned, recorded as a failure, and we move on.
                Err(_) => Err(HandlerError::Domain(DomainError::Timeout(reg.timeout))),
            };

            match result {
                Ok(()) => {
                    if attempt > 0 {
                        metrics.record_retried_execution(&event_type, true);
                        debug!(
                            handler = %reg.name,
                            attempts = attempt + 1,
                            "handler succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Err(err) => {
                    warn!(
                        handler = %reg.name,
                        event_type = %event_type,
                        attempt,
                        error = %err,
                        "handler attempt failed"
                    );
                    if err.is_retryable() && attempt < reg.retry.max_retries {
                        attempt += 1;
                        continue;
                    }
                    if attempt > 0 {
                        metrics.record_retried_execution(&event_type, false);
                    }
                    metrics.record_exhausted(&event_type);
                    if let Some(dlq) = &dlq {
                        dlq.push(DeadLetter {
                            event: (*event).clone(),
                            handler_name: reg.name.clone(),
                            error: err.to_string(),
                            attempts: attempt + 1,
                            failed_at: Utc::now(),
                        });
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl EventHandler for Dispatcher {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        self.dispatch(event).await.map_err(|err| {
            let detail = err.detail();
            HandlerError::Aggregate {
                failed: err.failures.len(),
                total: err.total,
                detail,
            }
        })
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
