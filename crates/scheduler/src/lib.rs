// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-scheduler: interval/cron job runner.

pub mod cron;
pub mod scheduler;

pub use cron::{CronExpr, CronParseError};
pub use scheduler::{
    job_fn, JobHandler, JobRun, JobSpec, Schedule, Scheduler, SchedulerConfig, SchedulerHooks,
};
