// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat API client and update ingestion.
//!
//! Updates arrive either via long-poll (default 30 s timeout) or webhook
//! POSTs; both carry the same JSON documents. Outbound sends are
//! breaker-wrapped and rate-limited with a sliding per-second window.

use crate::breaker::{BreakerConfig, CircuitBreaker};
use hearth_core::{Clock, DomainError, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub token: String,
    /// Long-poll timeout.
    pub poll_timeout: Duration,
    /// Max sends in any one-second window.
    pub per_second_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            poll_timeout: Duration::from_secs(30),
            per_second_limit: 30,
        }
    }
}

// -- update documents -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
}

/// One inbound update, from polling or a webhook POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// Parse a bot command from message text.
///
/// Returns `(command, args)` with the leading slash and any `@botname`
/// suffix stripped; `None` when the text is not a command.
pub fn parse_command<'a>(text: &'a str, bot_name: &str) -> Option<(&'a str, &'a str)> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let span_end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    let (mut command, args) = rest.split_at(span_end);
    if command.is_empty() {
        return None;
    }
    if let Some((name, target)) = command.split_once('@') {
        if !target.eq_ignore_ascii_case(bot_name) {
            // Addressed to a different bot
            return None;
        }
        command = name;
    }
    Some((command, args.trim_start()))
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Breaker-wrapped chat client.
pub struct ChatClient<C: Clock = SystemClock> {
    http: reqwest::Client,
    config: ChatConfig,
    breaker: CircuitBreaker<C>,
    sends: Mutex<VecDeque<Instant>>,
    clock: C,
}

impl ChatClient<SystemClock> {
    pub fn new(config: ChatConfig) -> Result<Self, DomainError> {
        Self::with_clock(config, BreakerConfig::chat_api(), SystemClock)
    }
}

impl<C: Clock + Clone> ChatClient<C> {
    pub fn with_clock(
        config: ChatConfig,
        breaker_config: BreakerConfig,
        clock: C,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            // Long polls must outlive the server-side hold
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        Ok(Self {
            http,
            breaker: CircuitBreaker::with_clock("chat-api", breaker_config, clock.clone()),
            config,
            sends: Mutex::new(VecDeque::new()),
            clock,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    /// Sliding one-second window over outbound sends.
    fn check_rate(&self) -> Result<(), DomainError> {
        let now = self.clock.now();
        let mut sends = self.sends.lock();
        while let Some(front) = sends.front() {
            if now.saturating_duration_since(*front) >= Duration::from_secs(1) {
                sends.pop_front();
            } else {
                break;
            }
        }
        if sends.len() >= self.config.per_second_limit.max(1) {
            let oldest = sends.front().copied().unwrap_or(now);
            let retry_after =
                Duration::from_secs(1).saturating_sub(now.saturating_duration_since(oldest));
            return Err(DomainError::RateLimited {
                retry_after: Some(retry_after),
            });
        }
        sends.push_back(now);
        Ok(())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, DomainError> {
        let url = self.method_url(method);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DomainError::Timeout(self.config.poll_timeout)
                } else {
                    DomainError::RetryableNetwork(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(DomainError::rate_limited());
        }
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| DomainError::RetryableNetwork(format!("bad envelope: {e}")))?;
        if !envelope.ok {
            let description = envelope.description.unwrap_or_else(|| "unknown".to_string());
            return Err(DomainError::NonRetryableRemote(description));
        }
        envelope
            .result
            .ok_or_else(|| DomainError::NonRetryableRemote("ok without result".to_string()))
    }

    /// Send a text message to a chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DomainError> {
        self.check_rate()?;
        self.breaker
            .execute(|| async {
                let _: Message = self
                    .call(
                        "sendMessage",
                        serde_json::json!({ "chat_id": chat_id, "text": text }),
                    )
                    .await?;
                Ok(())
            })
            .await
            .map_err(|err| err.into_domain())?;
        debug!(chat_id, "message sent");
        Ok(())
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, DomainError> {
        let mut body = serde_json::json!({
            "timeout": self.config.poll_timeout.as_secs(),
        });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }
        self.breaker
            .execute(|| self.call("getUpdates", body.clone()))
            .await
            .map_err(|err| err.into_domain())
    }

    /// Answer a callback query so the client stops its spinner.
    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), DomainError> {
        self.breaker
            .execute(|| async {
                let _: bool = self
                    .call(
                        "answerCallbackQuery",
                        serde_json::json!({ "callback_query_id": callback_id }),
                    )
                    .await?;
                Ok(())
            })
            .await
            .map_err(|err| err.into_domain())
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
