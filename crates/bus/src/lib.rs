// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-bus: the event fabric.
//!
//! Layers, bottom up:
//! - [`LocalBus`] — in-process typed publish/subscribe over a bounded
//!   worker pool;
//! - [`InstanceBus`] — the same contract fanned out across instances via
//!   the store's pub/sub channel, with self-echo suppression;
//! - [`BufferedBus`] — batches publishes, flushing on size or interval;
//! - [`Dispatcher`] — a firehose subscriber adding per-handler retries,
//!   timeouts, a middleware chain, and a dead-letter queue.

pub mod buffered;
pub mod bus;
pub mod dispatcher;
pub mod dlq;
pub mod handler;
pub mod instance;
pub mod local;
pub mod metrics;
pub mod middleware;

pub use buffered::{BufferedBus, BufferedBusConfig};
pub use bus::EventBus;
pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig, HandlerRegistration, RetryPolicy};
pub use dlq::{DeadLetter, DeadLetterQueue};
pub use handler::{handler_fn, EventHandler, HandlerError};
pub use instance::{Envelope, InstanceBus};
pub use local::{LocalBus, LocalBusConfig};
pub use metrics::{DispatchMetrics, TypeMetrics};
pub use middleware::{
    HandlerContext, LoggingMiddleware, MetricsMiddleware, Middleware, Next, RecoveryMiddleware,
    TimeoutMiddleware,
};
