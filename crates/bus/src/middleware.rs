// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher middleware chain.
//!
//! Middlewares wrap handler execution in registration order: the first
//! registered is outermost. Each receives the execution context and a
//! [`Next`] continuation covering the rest of the chain plus the handler.

use crate::handler::{EventHandler, HandlerError};
use crate::metrics::DispatchMetrics;
use async_trait::async_trait;
use futures::FutureExt;
use hearth_core::{DomainError, DomainEvent};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Execution context for one handler attempt.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub handler_name: String,
    /// 0-based attempt index (0 = first try).
    pub attempt: u32,
}

/// Continuation of the middleware chain.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    handler: &'a dyn EventHandler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], handler: &'a dyn EventHandler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    /// Run the rest of the chain, ending at the handler.
    pub async fn run(
        self,
        ctx: &HandlerContext,
        event: &DomainEvent,
    ) -> Result<(), HandlerError> {
        match self.middlewares.split_first() {
            Some((mw, rest)) => {
                let next = Next {
                    middlewares: rest,
                    handler: self.handler,
                };
                mw.call(ctx, event, next).await
            }
            None => self.handler.handle(event).await,
        }
    }
}

/// Around-style middleware.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError>;
}

/// Catches unexpected faults (panics) and converts them to
/// [`HandlerError::Panic`] so one broken handler cannot take down the
/// dispatch loop.
pub struct RecoveryMiddleware;

#[async_trait]
impl Middleware for RecoveryMiddleware {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError> {
        match AssertUnwindSafe(next.run(ctx, event)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    handler = %ctx.handler_name,
                    event_type = %event.event_type,
                    panic = %detail,
                    "handler panicked"
                );
                Err(HandlerError::Panic(detail))
            }
        }
    }
}

/// Logs each attempt with its duration and outcome.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError> {
        let started = Instant::now();
        let result = next.run(ctx, event).await;
        let elapsed = started.elapsed();
        match &result {
            Ok(()) => debug!(
                handler = %ctx.handler_name,
                event_type = %event.event_type,
                attempt = ctx.attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                "handler ok"
            ),
            Err(err) => warn!(
                handler = %ctx.handler_name,
                event_type = %event.event_type,
                attempt = ctx.attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "handler failed"
            ),
        }
        result
    }
}

/// Records per-type attempt counts, durations, and outcomes.
pub struct MetricsMiddleware {
    metrics: Arc<DispatchMetrics>,
}

impl MetricsMiddleware {
    pub fn new(metrics: Arc<DispatchMetrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError> {
        let started = Instant::now();
        let result = next.run(ctx, event).await;
        self.metrics.record_attempt(
            event.event_type.as_str(),
            started.elapsed(),
            result.is_ok(),
        );
        result
    }
}

/// Races the rest of the chain against a fixed timer. The registration's
/// own per-attempt timeout is applied by the dispatcher; this middleware
/// exists for callers that want one blanket bound across all handlers.
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    async fn call(
        &self,
        ctx: &HandlerContext,
        event: &DomainEvent,
        next: Next<'_>,
    ) -> Result<(), HandlerError> {
        match tokio::time::timeout(self.timeout, next.run(ctx, event)).await {
            Ok(result) => result,
            Err(_) => Err(HandlerError::Domain(DomainError::Timeout(self.timeout))),
        }
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
