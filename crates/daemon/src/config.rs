// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.
//!
//! Every option has a typed parser with a default; unparseable values
//! fall back to the default rather than failing startup. Validation only
//! rejects what cannot be defaulted: missing required secrets and an
//! out-of-range digest slot.

use hearth_core::{DomainError, Tz};
use hearth_storage::DatabaseConfig;
use std::time::Duration;

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64_list(key: &str) -> Vec<i64> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

fn env_str_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_secs),
    )
}

#[derive(Debug, Clone)]
pub struct PresenceStoreSettings {
    pub enabled: bool,
    pub url: String,
    pub online_ttl: Duration,
    pub away_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub token: String,
    pub base_url: String,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub use_webhook: bool,
    pub poll_timeout: Duration,
    pub per_second_limit: usize,
    pub admin_principals: Vec<i64>,
    /// Broadcast chat for the daily digest, if configured.
    pub digest_chat_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub cache_ttl: Duration,
    pub cohorts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub sync_interval: Duration,
    pub rebuild_interval: Duration,
    pub inactivity_interval: Duration,
    pub cleanup_interval: Duration,
    pub digest_hour: u32,
    pub digest_minute: u32,
    pub max_concurrent: usize,
    pub job_timeout: Duration,
    /// Snapshots older than this are deleted by cleanup.
    pub snapshot_retention: Duration,
    /// No activity for this long flags a student inactive.
    pub inactivity_horizon: Duration,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

/// Process-wide configuration, loaded once and validated before any
/// service starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub debug: bool,
    pub timezone: Tz,
    pub database: DatabaseConfig,
    pub presence_store: PresenceStoreSettings,
    pub chat: ChatSettings,
    pub platform: PlatformSettings,
    pub scheduler: SchedulerSettings,
    pub shutdown_timeout: Duration,
    pub log: LogSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            environment: env_str("HEARTH_ENV", "development"),
            debug: env_bool("HEARTH_DEBUG", false),
            timezone: Tz::parse(&env_str("HEARTH_TIMEZONE", "UTC")).unwrap_or_default(),
            database: DatabaseConfig {
                url: env_str("HEARTH_DATABASE_URL", ""),
                max_connections: env_u32("HEARTH_DB_MAX_CONNECTIONS", 10),
                min_connections: env_u32("HEARTH_DB_MIN_CONNECTIONS", 1),
                max_lifetime: env_secs("HEARTH_DB_MAX_LIFETIME_SECS", 1800),
                idle_timeout: env_secs("HEARTH_DB_IDLE_TIMEOUT_SECS", 300),
                acquire_timeout: env_secs("HEARTH_DB_ACQUIRE_TIMEOUT_SECS", 10),
            },
            presence_store: PresenceStoreSettings {
                enabled: env_bool("HEARTH_PRESENCE_STORE_ENABLED", false),
                url: env_str("HEARTH_PRESENCE_STORE_URL", "redis://127.0.0.1:6379/0"),
                online_ttl: env_secs("HEARTH_PRESENCE_ONLINE_TTL_SECS", 300),
                away_ttl: env_secs("HEARTH_PRESENCE_AWAY_TTL_SECS", 1800),
            },
            chat: ChatSettings {
                token: env_str("HEARTH_CHAT_TOKEN", ""),
                base_url: env_str("HEARTH_CHAT_BASE_URL", "https://api.telegram.org"),
                webhook_url: env_opt("HEARTH_CHAT_WEBHOOK_URL"),
                webhook_secret: env_opt("HEARTH_CHAT_WEBHOOK_SECRET"),
                use_webhook: env_bool("HEARTH_CHAT_USE_WEBHOOK", false),
                poll_timeout: env_secs("HEARTH_CHAT_POLL_TIMEOUT_SECS", 30),
                per_second_limit: env_usize("HEARTH_CHAT_PER_SECOND_LIMIT", 30),
                admin_principals: env_i64_list("HEARTH_CHAT_ADMIN_PRINCIPALS"),
                digest_chat_id: env_opt("HEARTH_CHAT_DIGEST_CHAT_ID")
                    .and_then(|v| v.parse().ok()),
            },
            platform: PlatformSettings {
                base_url: env_str("HEARTH_PLATFORM_BASE_URL", ""),
                api_key: env_str("HEARTH_PLATFORM_API_KEY", ""),
                request_timeout: env_secs("HEARTH_PLATFORM_TIMEOUT_SECS", 10),
                max_retries: env_u32("HEARTH_PLATFORM_MAX_RETRIES", 3),
                initial_backoff: env_secs("HEARTH_PLATFORM_BACKOFF_SECS", 1),
                cache_ttl: env_secs("HEARTH_PLATFORM_CACHE_TTL_SECS", 60),
                cohorts: env_str_list("HEARTH_PLATFORM_COHORTS"),
            },
            scheduler: SchedulerSettings {
                enabled: env_bool("HEARTH_SCHEDULER_ENABLED", true),
                sync_interval: env_secs("HEARTH_SYNC_INTERVAL_SECS", 300),
                rebuild_interval: env_secs("HEARTH_REBUILD_INTERVAL_SECS", 600),
                inactivity_interval: env_secs("HEARTH_INACTIVITY_INTERVAL_SECS", 3600),
                cleanup_interval: env_secs("HEARTH_CLEANUP_INTERVAL_SECS", 21600),
                digest_hour: env_u32("HEARTH_DIGEST_HOUR", 9),
                digest_minute: env_u32("HEARTH_DIGEST_MINUTE", 0),
                max_concurrent: env_usize("HEARTH_SCHEDULER_MAX_CONCURRENT", 4),
                job_timeout: env_secs("HEARTH_JOB_TIMEOUT_SECS", 300),
                snapshot_retention: env_secs("HEARTH_SNAPSHOT_RETENTION_SECS", 30 * 86400),
                inactivity_horizon: env_secs("HEARTH_INACTIVITY_HORIZON_SECS", 14 * 86400),
            },
            shutdown_timeout: env_secs("HEARTH_SHUTDOWN_TIMEOUT_SECS", 30),
            log: LogSettings {
                level: env_str("HEARTH_LOG_LEVEL", "info"),
                json: env_bool("HEARTH_LOG_JSON", false),
            },
        }
    }

    /// Reject configurations that cannot be defaulted away.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chat.token.is_empty() {
            return Err(DomainError::InvalidInput(
                "HEARTH_CHAT_TOKEN is required".to_string(),
            ));
        }
        if self.database.url.is_empty() {
            return Err(DomainError::InvalidInput(
                "HEARTH_DATABASE_URL is required".to_string(),
            ));
        }
        if self.scheduler.digest_hour > 23 {
            return Err(DomainError::InvalidInput(format!(
                "digest hour {} out of range",
                self.scheduler.digest_hour
            )));
        }
        if self.scheduler.digest_minute > 59 {
            return Err(DomainError::InvalidInput(format!(
                "digest minute {} out of range",
                self.scheduler.digest_minute
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
