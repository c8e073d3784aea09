// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handler capability.

use async_trait::async_trait;
use hearth_core::{DomainError, DomainEvent};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by an event handler or the machinery around it.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Unexpected fault caught by the recovery middleware.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// Several sync handlers failed for one event.
    #[error("{failed} of {total} handlers failed: {detail}")]
    Aggregate {
        failed: usize,
        total: usize,
        detail: String,
    },
}

impl HandlerError {
    /// Whether the dispatcher should retry. Conflict and integrity
    /// failures never are; a recovered panic is (the fault may be
    /// transient state).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Domain(DomainError::Conflict(_)) | Self::Domain(DomainError::Integrity(_)) => {
                false
            }
            Self::Domain(_) | Self::Panic(_) | Self::Aggregate { .. } => true,
        }
    }
}

/// A subscriber to domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        (self.0)(event.clone()).await
    }
}

/// Wrap an async closure as an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
