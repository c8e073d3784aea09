// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presence tracker over the hot store.
//!
//! State is derived from last-seen age, never stored authoritatively:
//! online under `online_ttl`, away under `away_ttl`, offline beyond that.
//! Layout: a per-student record `online:{student}` with TTL = `away_ttl`,
//! a global ordered set `online:all` scored by last-seen unix second, and
//! per-task ordered sets `online:task:{task}`. Transition events are
//! published fire-and-forget.

use hearth_bus::EventBus;
use hearth_core::{Clock, DomainError, DomainEvent, EventType, PresenceRecord, PresenceState,
    StudentId, SystemClock, TaskId};
use hearth_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const ALL_KEY: &str = "online:all";

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("presence record for {0} is undecodable: {1}")]
    Decode(StudentId, String),
}

/// TTL windows for state derivation.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub online_ttl: Duration,
    pub away_ttl: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_ttl: Duration::from_secs(5 * 60),
            away_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// What a client reports when coming online.
#[derive(Debug, Clone)]
pub struct OnlineInfo {
    pub student_id: StudentId,
    pub display_name: String,
    pub current_task: Option<TaskId>,
    pub available_for_help: bool,
}

/// TTL-based presence tracker.
pub struct PresenceTracker<C: Clock = SystemClock> {
    store: Arc<dyn Store>,
    bus: Option<Arc<dyn EventBus>>,
    config: PresenceConfig,
    clock: C,
}

impl PresenceTracker<SystemClock> {
    pub fn new(store: Arc<dyn Store>, config: PresenceConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<C: Clock> PresenceTracker<C> {
    pub fn with_clock(store: Arc<dyn Store>, config: PresenceConfig, clock: C) -> Self {
        Self {
            store,
            bus: None,
            config,
            clock,
        }
    }

    /// Publish transition events onto the given bus.
    pub fn with_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn record_key(student_id: &StudentId) -> String {
        format!("online:{student_id}")
    }

    fn task_key(task_id: &TaskId) -> String {
        format!("online:task:{task_id}")
    }

    fn derive_state(&self, record: &PresenceRecord) -> PresenceState {
        let age = (self.clock.now_utc() - record.last_seen_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        PresenceState::from_age(age, self.config.online_ttl, self.config.away_ttl)
    }

    async fn load_record(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<PresenceRecord>, PresenceError> {
        let Some(raw) = self.store.get(&Self::record_key(student_id)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PresenceError::Decode(student_id.clone(), e.to_string()))
    }

    async fn save_record(
        &self,
        record: &PresenceRecord,
        ttl: Duration,
    ) -> Result<(), PresenceError> {
        let json = serde_json::to_string(record)
            .map_err(|e| PresenceError::Decode(record.student_id.clone(), e.to_string()))?;
        self.store
            .set(&Self::record_key(&record.student_id), &json, Some(ttl))
            .await?;
        Ok(())
    }

    /// Fire-and-forget transition event.
    async fn publish(&self, event_type: EventType, record: &PresenceRecord) {
        let Some(bus) = &self.bus else {
            return;
        };
        let mut event = DomainEvent::at(
            event_type,
            record.student_id.as_str(),
            self.clock.now_utc(),
        )
        .with("display_name", record.display_name.clone())
        .with("available_for_help", record.available_for_help);
        if let Some(task) = &record.current_task {
            event = event.with("current_task", task.as_str());
        }
        if let Err(err) = bus.publish(event).await {
            if err != DomainError::Closed {
                warn!(error = %err, "presence event publish failed");
            }
        }
    }

    // -- writes -------------------------------------------------------------

    /// Mark a student online, publishing `went_online` on transition.
    pub async fn set_online(&self, info: OnlineInfo) -> Result<(), PresenceError> {
        let now = self.clock.now_utc();
        let prior = self.load_record(&info.student_id).await?;
        let prior_state = prior
            .as_ref()
            .map(|r| self.derive_state(r))
            .unwrap_or(PresenceState::Offline);

        // Remove a stale task membership if the student switched tasks
        if let Some(prior_record) = &prior {
            if let Some(old_task) = &prior_record.current_task {
                if prior_record.current_task != info.current_task {
                    self.store
                        .zrem(&Self::task_key(old_task), info.student_id.as_str())
                        .await?;
                }
            }
        }

        let record = PresenceRecord {
            student_id: info.student_id.clone(),
            display_name: info.display_name,
            state: PresenceState::Online,
            last_seen_at: now,
            current_task: info.current_task,
            available_for_help: info.available_for_help,
            session_started_at: prior
                .as_ref()
                .filter(|r| self.derive_state(r) != PresenceState::Offline)
                .map(|r| r.session_started_at)
                .unwrap_or(now),
        };

        self.save_record(&record, self.config.away_ttl).await?;
        self.store
            .zadd(ALL_KEY, record.student_id.as_str(), now.timestamp() as f64)
            .await?;
        if let Some(task) = &record.current_task {
            self.store
                .zadd(
                    &Self::task_key(task),
                    record.student_id.as_str(),
                    now.timestamp() as f64,
                )
                .await?;
        }

        if prior_state != PresenceState::Online {
            debug!(student = %record.student_id, from = %prior_state, "went online");
            self.publish(EventType::WentOnline, &record).await;
        }
        Ok(())
    }

    /// Refresh the last-seen stamp. Creates a minimal record when absent.
    pub async fn heartbeat(&self, student_id: &StudentId) -> Result<(), PresenceError> {
        let now = self.clock.now_utc();
        let prior = self.load_record(student_id).await?;
        let prior_state = prior
            .as_ref()
            .map(|r| self.derive_state(r))
            .unwrap_or(PresenceState::Offline);

        let mut record = prior.unwrap_or_else(|| PresenceRecord::minimal(student_id.clone(), now));
        record.last_seen_at = now;
        record.state = PresenceState::Online;

        self.save_record(&record, self.config.away_ttl).await?;
        self.store
            .zadd(ALL_KEY, student_id.as_str(), now.timestamp() as f64)
            .await?;

        // No event unless this heartbeat changed the derived state
        if prior_state != PresenceState::Online {
            self.publish(EventType::WentOnline, &record).await;
        }
        Ok(())
    }

    /// Mark a student away. Only valid while online; returns whether the
    /// transition happened.
    pub async fn set_away(&self, student_id: &StudentId) -> Result<bool, PresenceError> {
        let Some(mut record) = self.load_record(student_id).await? else {
            return Ok(false);
        };
        if self.derive_state(&record) != PresenceState::Online {
            return Ok(false);
        }

        record.state = PresenceState::Away;
        // Keep the record only for what remains of the away window
        let age = (self.clock.now_utc() - record.last_seen_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let remaining = self.config.away_ttl.saturating_sub(age).max(Duration::from_secs(1));
        self.save_record(&record, remaining).await?;

        debug!(student = %student_id, "went away");
        self.publish(EventType::WentAway, &record).await;
        Ok(true)
    }

    /// Remove a student's presence entirely, publishing `went_offline` on
    /// transition.
    pub async fn set_offline(&self, student_id: &StudentId) -> Result<(), PresenceError> {
        let prior = self.load_record(student_id).await?;
        let prior_state = prior
            .as_ref()
            .map(|r| self.derive_state(r))
            .unwrap_or(PresenceState::Offline);

        self.store.del(&Self::record_key(student_id)).await?;
        self.store.zrem(ALL_KEY, student_id.as_str()).await?;
        if let Some(record) = &prior {
            if let Some(task) = &record.current_task {
                self.store
                    .zrem(&Self::task_key(task), student_id.as_str())
                    .await?;
            }
        }

        if prior_state != PresenceState::Offline {
            let record = prior.unwrap_or_else(|| {
                PresenceRecord::minimal(student_id.clone(), self.clock.now_utc())
            });
            debug!(student = %student_id, "went offline");
            self.publish(EventType::WentOffline, &record).await;
        }
        Ok(())
    }

    /// Drop index entries older than the away window.
    pub async fn cleanup_stale(&self) -> Result<u64, PresenceError> {
        let cutoff = self.clock.now_utc().timestamp() - self.config.away_ttl.as_secs() as i64;
        Ok(self.store.zremrangebyscore_lte(ALL_KEY, cutoff as f64).await?)
    }

    // -- reads --------------------------------------------------------------

    /// Derived state; offline when the record is gone.
    pub async fn get_state(&self, student_id: &StudentId) -> Result<PresenceState, PresenceError> {
        Ok(self
            .load_record(student_id)
            .await?
            .map(|r| self.derive_state(&r))
            .unwrap_or(PresenceState::Offline))
    }

    /// All records currently online, freshest last-seen first.
    pub async fn get_all_online(&self) -> Result<Vec<PresenceRecord>, PresenceError> {
        self.records_since(self.config.online_ttl, |state| state == PresenceState::Online)
            .await
    }

    /// Records seen within `within`, any non-offline state.
    pub async fn get_recently_online(
        &self,
        within: Duration,
    ) -> Result<Vec<PresenceRecord>, PresenceError> {
        self.records_since(within, |state| state != PresenceState::Offline)
            .await
    }

    pub async fn count_online(&self) -> Result<usize, PresenceError> {
        Ok(self.get_all_online().await?.len())
    }

    /// Students online on a specific task.
    pub async fn get_online_for_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<StudentId>, PresenceError> {
        let cutoff = self.clock.now_utc().timestamp() - self.config.online_ttl.as_secs() as i64;
        let members = self
            .store
            .zrangebyscore_gt(&Self::task_key(task_id), cutoff as f64)
            .await?;
        Ok(members.into_iter().map(|(id, _)| StudentId::new(id)).collect())
    }

    async fn records_since(
        &self,
        window: Duration,
        keep: impl Fn(PresenceState) -> bool,
    ) -> Result<Vec<PresenceRecord>, PresenceError> {
        let cutoff = self.clock.now_utc().timestamp() - window.as_secs() as i64;
        let members = self.store.zrangebyscore_gt(ALL_KEY, cutoff as f64).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = members
            .iter()
            .map(|(id, _)| Self::record_key(&StudentId::new(id.clone())))
            .collect();
        let raws = self.store.mget(&keys).await?;

        let mut records = Vec::new();
        for ((id, _), raw) in members.into_iter().zip(raws) {
            // Record may have expired between the index read and mget
            let Some(raw) = raw else { continue };
            let mut record: PresenceRecord = match serde_json::from_str(&raw) {
                Ok(r) => r,
                Err(err) => {
                    warn!(student = %id, error = %err, "dropping undecodable presence record");
                    continue;
                }
            };
            record.state = self.derive_state(&record);
            if keep(record.state) {
                records.push(record);
            }
        }
        // Freshest activity first
        records.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(records)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
