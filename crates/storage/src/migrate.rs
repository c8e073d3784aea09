// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numbered schema migrations.
//!
//! Each migration runs in its own transaction and is recorded in the
//! `schema_migrations` ledger on success, so re-running the runner is
//! idempotent and a failure leaves the schema at a known version.

use crate::db::map_sqlx_error;
use hearth_core::DomainError;
use sqlx::PgPool;
use tracing::info;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "students",
        sql: r#"
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    principal_id BIGINT,
    login TEXT NOT NULL,
    display_name TEXT NOT NULL,
    cohort TEXT NOT NULL,
    status TEXT NOT NULL,
    xp BIGINT NOT NULL DEFAULT 0 CHECK (xp >= 0),
    presence TEXT NOT NULL DEFAULT 'offline',
    last_seen_at TIMESTAMPTZ,
    last_synced_at TIMESTAMPTZ,
    prefs JSONB NOT NULL DEFAULT '{}',
    helper_rating REAL NOT NULL DEFAULT 0,
    help_count INTEGER NOT NULL DEFAULT 0,
    available_for_help BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS students_principal_active
    ON students (principal_id) WHERE status = 'active' AND principal_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS students_login_active
    ON students (login) WHERE status = 'active';
CREATE INDEX IF NOT EXISTS students_cohort ON students (cohort);
"#,
    },
    Migration {
        version: 2,
        name: "xp_history",
        sql: r#"
CREATE TABLE IF NOT EXISTS xp_history (
    id BIGSERIAL PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students (id),
    old_xp BIGINT NOT NULL,
    new_xp BIGINT NOT NULL,
    delta BIGINT NOT NULL,
    reason TEXT NOT NULL,
    task_id TEXT,
    recorded_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS xp_history_student ON xp_history (student_id, recorded_at);
"#,
    },
    Migration {
        version: 3,
        name: "daily_grinds",
        sql: r#"
CREATE TABLE IF NOT EXISTS daily_grinds (
    student_id TEXT NOT NULL REFERENCES students (id),
    day DATE NOT NULL,
    xp_start BIGINT NOT NULL,
    xp_current BIGINT NOT NULL,
    xp_gained BIGINT NOT NULL,
    tasks_completed INTEGER NOT NULL DEFAULT 0,
    session_count INTEGER NOT NULL DEFAULT 1,
    session_minutes INTEGER NOT NULL DEFAULT 0,
    first_activity_at TIMESTAMPTZ NOT NULL,
    last_activity_at TIMESTAMPTZ NOT NULL,
    rank_start INTEGER,
    rank_current INTEGER,
    rank_change INTEGER NOT NULL DEFAULT 0,
    streak_day INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (student_id, day)
);
"#,
    },
    Migration {
        version: 4,
        name: "streaks",
        sql: r#"
CREATE TABLE IF NOT EXISTS streaks (
    student_id TEXT PRIMARY KEY REFERENCES students (id),
    current INTEGER NOT NULL DEFAULT 0,
    best INTEGER NOT NULL DEFAULT 0 CHECK (best >= current),
    last_active_day DATE,
    started_on DATE
);
"#,
    },
    Migration {
        version: 5,
        name: "achievements",
        sql: r#"
CREATE TABLE IF NOT EXISTS achievements (
    student_id TEXT NOT NULL REFERENCES students (id),
    kind TEXT NOT NULL,
    unlocked_at TIMESTAMPTZ NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}',
    PRIMARY KEY (student_id, kind)
);
"#,
    },
    Migration {
        version: 6,
        name: "snapshots",
        sql: r#"
CREATE TABLE IF NOT EXISTS leaderboard_snapshots (
    id TEXT PRIMARY KEY,
    cohort TEXT NOT NULL,
    taken_at TIMESTAMPTZ NOT NULL,
    total_students INTEGER NOT NULL,
    total_xp BIGINT NOT NULL,
    average_xp DOUBLE PRECISION NOT NULL
);
CREATE INDEX IF NOT EXISTS snapshots_cohort_time
    ON leaderboard_snapshots (cohort, taken_at DESC);

CREATE TABLE IF NOT EXISTS leaderboard_entries (
    snapshot_id TEXT NOT NULL REFERENCES leaderboard_snapshots (id) ON DELETE CASCADE,
    student_id TEXT NOT NULL,
    login TEXT NOT NULL,
    display_name TEXT NOT NULL,
    rank INTEGER NOT NULL,
    xp BIGINT NOT NULL,
    level INTEGER NOT NULL,
    rank_change INTEGER NOT NULL DEFAULT 0,
    online BOOLEAN NOT NULL DEFAULT FALSE,
    available_for_help BOOLEAN NOT NULL DEFAULT FALSE,
    helper_rating REAL NOT NULL DEFAULT 0,
    help_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (snapshot_id, student_id)
);
"#,
    },
    Migration {
        version: 7,
        name: "rank_history",
        sql: r#"
CREATE TABLE IF NOT EXISTS rank_history (
    student_id TEXT NOT NULL,
    snapshot_id TEXT NOT NULL,
    rank INTEGER NOT NULL,
    xp BIGINT NOT NULL,
    taken_at TIMESTAMPTZ NOT NULL,
    rank_change INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (student_id, taken_at)
);
"#,
    },
    Migration {
        version: 8,
        name: "task_completions",
        sql: r#"
CREATE TABLE IF NOT EXISTS task_completions (
    student_id TEXT NOT NULL REFERENCES students (id),
    task_id TEXT NOT NULL,
    task_name TEXT NOT NULL,
    xp_earned BIGINT NOT NULL,
    completed_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (student_id, task_id)
);
CREATE INDEX IF NOT EXISTS task_completions_task ON task_completions (task_id);
"#,
    },
];

/// Applies pending migrations in version order.
pub struct MigrationRunner<'a> {
    pool: &'a PgPool,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations. Returns how many were applied.
    pub async fn run(&self) -> Result<usize, DomainError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
            .fetch_all(self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut count = 0;
        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            sqlx::raw_sql(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
                .bind(migration.version)
                .bind(migration.name)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            tx.commit().await.map_err(map_sqlx_error)?;
            info!(version = migration.version, name = migration.name, "migration applied");
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
