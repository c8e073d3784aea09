// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-integrations: breaker-wrapped outbound clients.
//!
//! The circuit breaker shields the learning-platform and chat-API
//! integrations; both clients retry transient failures with exponential
//! backoff and map HTTP outcomes onto the shared error kinds.

pub mod breaker;
pub mod chat;
pub mod platform;

pub use breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
pub use chat::{parse_command, ChatClient, ChatConfig, Update};
pub use platform::{PlatformClient, PlatformConfig, PlatformProgress, PlatformTask};
