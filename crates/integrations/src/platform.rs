// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Learning-platform HTTP client.
//!
//! JSON over HTTP, breaker-wrapped, with exponential-backoff retries that
//! honor `Retry-After` on rate-limit responses and a bounded TTL response
//! cache for repeat reads inside one sync window.

use crate::breaker::{BreakerConfig, CircuitBreaker};
use chrono::{DateTime, Utc};
use hearth_core::{Clock, DomainError, SystemClock};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub cache_ttl: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// A task as reported by the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One student's progress as reported by the platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformProgress {
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub cohort: Option<String>,
    #[serde(default)]
    pub completed_tasks: Vec<PlatformTask>,
}

/// Map an HTTP status onto the shared error kinds.
fn classify_status(status: u16, retry_after: Option<Duration>, body: &str) -> DomainError {
    match status {
        429 => DomainError::RateLimited { retry_after },
        400..=499 => DomainError::NonRetryableRemote(format!("{status}: {body}")),
        _ => DomainError::RetryableNetwork(format!("{status}: {body}")),
    }
}

/// Parse a `Retry-After` header value (delta-seconds form).
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

struct CachedResponse {
    fetched: Instant,
    value: serde_json::Value,
}

/// Breaker-wrapped platform client.
pub struct PlatformClient<C: Clock = SystemClock> {
    http: reqwest::Client,
    config: PlatformConfig,
    breaker: CircuitBreaker<C>,
    cache: Mutex<HashMap<String, CachedResponse>>,
    clock: C,
}

impl PlatformClient<SystemClock> {
    pub fn new(config: PlatformConfig) -> Result<Self, DomainError> {
        Self::with_clock(config, BreakerConfig::platform_api(), SystemClock)
    }
}

impl<C: Clock + Clone> PlatformClient<C> {
    pub fn with_clock(
        config: PlatformConfig,
        breaker_config: BreakerConfig,
        clock: C,
    ) -> Result<Self, DomainError> {
        // 4xx responses are the remote's verdict, not platform downtime
        let breaker_config = if breaker_config.is_failure.is_some() {
            breaker_config
        } else {
            breaker_config
                .with_classifier(|err| !matches!(err, DomainError::NonRetryableRemote(_)))
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        Ok(Self {
            http,
            breaker: CircuitBreaker::with_clock("platform-api", breaker_config, clock.clone()),
            config,
            cache: Mutex::new(HashMap::new()),
            clock,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    fn cached(&self, path: &str) -> Option<serde_json::Value> {
        let cache = self.cache.lock();
        let hit = cache.get(path)?;
        if self.clock.now().saturating_duration_since(hit.fetched) < self.config.cache_ttl {
            Some(hit.value.clone())
        } else {
            None
        }
    }

    fn store_cached(&self, path: &str, value: &serde_json::Value) {
        let mut cache = self.cache.lock();
        // Drop expired entries so the cache stays bounded by live paths
        let now = self.clock.now();
        let ttl = self.config.cache_ttl;
        cache.retain(|_, hit| now.saturating_duration_since(hit.fetched) < ttl);
        cache.insert(
            path.to_string(),
            CachedResponse {
                fetched: now,
                value: value.clone(),
            },
        );
    }

    async fn fetch_once(&self, path: &str) -> Result<serde_json::Value, DomainError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DomainError::Timeout(self.config.request_timeout)
                } else {
                    DomainError::RetryableNetwork(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return response
                .json()
                .await
                .map_err(|e| DomainError::NonRetryableRemote(format!("bad json: {e}")));
        }
        let retry_after = parse_retry_after(
            response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok()),
        );
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, retry_after, &body))
    }

    async fn fetch_with_retries(&self, path: &str) -> Result<serde_json::Value, DomainError> {
        let mut attempt: u32 = 0;
        loop {
            match self.fetch_once(path).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let can_retry = err.is_retryable() && attempt < self.config.max_retries;
                    if !can_retry {
                        return Err(err);
                    }
                    let backoff = match &err {
                        DomainError::RateLimited {
                            retry_after: Some(hint),
                        } => *hint,
                        _ => {
                            let factor = 2u32.saturating_pow(attempt);
                            self.config.initial_backoff * factor
                        }
                    };
                    warn!(path, attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "platform request retry");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetch a JSON document, consulting the response cache first.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, DomainError> {
        if let Some(hit) = self.cached(path) {
            debug!(path, "platform response cache hit");
            return Ok(hit);
        }
        let value = self
            .breaker
            .execute(|| self.fetch_with_retries(path))
            .await
            .map_err(|err| err.into_domain())?;
        self.store_cached(path, &value);
        Ok(value)
    }

    /// One student's progress.
    pub async fn get_student_progress(
        &self,
        login: &str,
    ) -> Result<PlatformProgress, DomainError> {
        let value = self.get_json(&format!("students/{login}/progress")).await?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::NonRetryableRemote(format!("unexpected shape: {e}")))
    }

    /// Every student's progress for a cohort.
    pub async fn get_cohort_progress(
        &self,
        cohort: &str,
    ) -> Result<Vec<PlatformProgress>, DomainError> {
        let value = self.get_json(&format!("cohorts/{cohort}/progress")).await?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::NonRetryableRemote(format!("unexpected shape: {e}")))
    }

    pub fn invalidate_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
