// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature flags with hashed-bucket gradual rollout.
//!
//! Bucketing must be deterministic for fixed inputs, so the hash algorithm
//! (FNV-1a 32-bit) is part of the contract rather than an implementation
//! detail.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flag definition, keyed by dot-separated name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub name: String,
    pub enabled: bool,
    /// Share of principals the flag is on for, in [0, 100].
    pub rollout_percent: u8,
    /// When non-empty, only these cohorts see the flag.
    #[serde(default)]
    pub target_cohorts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub variants: Vec<String>,
}

impl FeatureFlag {
    /// A flag fully on for everyone.
    pub fn on(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            rollout_percent: 100,
            target_cohorts: Vec::new(),
            enabled_from: None,
            enabled_until: None,
            variants: Vec::new(),
        }
    }

    pub fn with_rollout(mut self, percent: u8) -> Self {
        self.rollout_percent = percent.min(100);
        self
    }

    pub fn with_cohorts(mut self, cohorts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.target_cohorts = cohorts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_window(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.enabled_from = from;
        self.enabled_until = until;
        self
    }

    pub fn with_variants(mut self, variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.variants = variants.into_iter().map(Into::into).collect();
        self
    }
}

/// The identity a flag is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub cohort: Option<String>,
    pub admin: bool,
}

impl Principal {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            cohort: None,
            admin: false,
        }
    }

    pub fn in_cohort(id: i64, cohort: impl Into<String>) -> Self {
        Self {
            id,
            cohort: Some(cohort.into()),
            admin: false,
        }
    }

    pub fn admin(id: i64) -> Self {
        Self {
            id,
            cohort: None,
            admin: true,
        }
    }
}

#[derive(Default)]
struct FlagState {
    flags: HashMap<String, FeatureFlag>,
    /// (flag name, principal id) -> forced value.
    overrides: HashMap<(String, i64), bool>,
}

/// Thread-safe flag store with per-principal overrides.
#[derive(Default)]
pub struct FlagStore {
    state: RwLock<FlagState>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, flag: FeatureFlag) {
        let mut state = self.state.write();
        state.flags.insert(flag.name.clone(), flag);
    }

    pub fn remove(&self, name: &str) {
        let mut state = self.state.write();
        state.flags.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<FeatureFlag> {
        self.state.read().flags.get(name).cloned()
    }

    /// Force a flag on or off for one principal, bypassing evaluation.
    pub fn set_override(&self, name: impl Into<String>, principal_id: i64, enabled: bool) {
        let mut state = self.state.write();
        state.overrides.insert((name.into(), principal_id), enabled);
    }

    pub fn clear_override(&self, name: &str, principal_id: i64) {
        let mut state = self.state.write();
        state.overrides.remove(&(name.to_string(), principal_id));
    }

    /// Evaluate a flag for a principal.
    ///
    /// Order: per-principal override, admin short-circuit, enabled +
    /// time-window + cohort gates, then hashed bucket vs rollout percent.
    pub fn is_enabled(&self, name: &str, principal: &Principal, now: DateTime<Utc>) -> bool {
        let state = self.state.read();

        if let Some(forced) = state.overrides.get(&(name.to_string(), principal.id)) {
            return *forced;
        }
        if principal.admin {
            return state.flags.contains_key(name);
        }

        let Some(flag) = state.flags.get(name) else {
            return false;
        };
        if !flag.enabled {
            return false;
        }
        if let Some(from) = flag.enabled_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = flag.enabled_until {
            if now >= until {
                return false;
            }
        }
        if !flag.target_cohorts.is_empty() {
            match &principal.cohort {
                Some(cohort) if flag.target_cohorts.contains(cohort) => {}
                _ => return false,
            }
        }

        bucket(name, principal.id) < flag.rollout_percent as u32
    }

    /// Pick the variant for a principal, or `None` when the flag is off or
    /// has no variants.
    pub fn variant(&self, name: &str, principal: &Principal, now: DateTime<Utc>) -> Option<String> {
        if !self.is_enabled(name, principal, now) {
            return None;
        }
        let state = self.state.read();
        let flag = state.flags.get(name)?;
        if flag.variants.is_empty() {
            return None;
        }
        let key = format!("{name}_variant{}", principal.id);
        let idx = (fnv1a32(key.as_bytes()) as usize) % flag.variants.len();
        flag.variants.get(idx).cloned()
    }
}

/// Rollout bucket in [0, 100) for (flag, principal).
fn bucket(flag_name: &str, principal_id: i64) -> u32 {
    let key = format!("{flag_name}{principal_id}");
    fnv1a32(key.as_bytes()) % 100
}

/// FNV-1a, 32-bit.
fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
