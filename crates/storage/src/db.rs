// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool construction and error classification.

use hearth_core::DomainError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(5 * 60),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Owns the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(map_sqlx_error)?;
        info!(max = config.max_connections, "database pool ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map sqlx failures onto the shared error kinds.
///
/// Unique and foreign-key violations become conflicts (never retried);
/// not-null and check violations become integrity faults; transport
/// problems stay retryable.
pub fn map_sqlx_error(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::RowNotFound => DomainError::NotFound("row".to_string()),
        sqlx::Error::PoolTimedOut => DomainError::Timeout(Duration::from_secs(10)),
        sqlx::Error::PoolClosed => DomainError::Closed,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            DomainError::RetryableNetwork(err.to_string())
        }
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // unique_violation, foreign_key_violation
            Some("23505") | Some("23503") => DomainError::Conflict(db.message().to_string()),
            // not_null_violation, check_violation
            Some("23502") | Some("23514") => DomainError::Integrity(db.message().to_string()),
            _ => DomainError::Unavailable(db.message().to_string()),
        },
        _ => DomainError::Unavailable(err.to_string()),
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
