// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-storage: Postgres persistence.
//!
//! Repositories over one [`sqlx::PgPool`]: students and XP history,
//! progress (daily grinds, streaks, achievements, task completions), and
//! leaderboard snapshots with rank history. Migrations are numbered,
//! applied in order inside a transaction each, and recorded in the
//! `schema_migrations` ledger.

pub mod db;
pub mod migrate;
pub mod progress;
pub mod snapshots;
pub mod students;

pub use db::{map_sqlx_error, Database, DatabaseConfig};
pub use migrate::MigrationRunner;
pub use progress::ProgressRepository;
pub use snapshots::SnapshotRepository;
pub use students::StudentRepository;
