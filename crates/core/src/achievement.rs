// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unlocked achievements. Unique per (student, kind).

use crate::id::StudentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub student_id: StudentId,
    /// Free-form achievement kind, e.g. `"first_task"`, `"streak_7"`.
    pub kind: String,
    pub unlocked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Achievement {
    pub fn new(
        student_id: StudentId,
        kind: impl Into<String>,
        unlocked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            kind: kind.into(),
            unlocked_at,
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
