// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-presence: TTL-based online/away/offline tracking.

pub mod tracker;

pub use tracker::{OnlineInfo, PresenceConfig, PresenceError, PresenceTracker};
