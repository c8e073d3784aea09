// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Student repository.
//!
//! XP is monotonic in normal operation: a decrease is rejected unless the
//! caller supplies a reason, and every change lands in `xp_history`.

use crate::db::map_sqlx_error;
use chrono::{DateTime, Utc};
use hearth_core::{
    DomainError, NotificationPrefs, PresenceState, Student, StudentId, StudentStatus, TaskId,
    XpHistoryEntry,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

fn status_str(status: StudentStatus) -> &'static str {
    match status {
        StudentStatus::Active => "active",
        StudentStatus::Inactive => "inactive",
        StudentStatus::Left => "left",
    }
}

fn parse_status(s: &str) -> StudentStatus {
    match s {
        "inactive" => StudentStatus::Inactive,
        "left" => StudentStatus::Left,
        _ => StudentStatus::Active,
    }
}

fn presence_str(state: PresenceState) -> &'static str {
    match state {
        PresenceState::Online => "online",
        PresenceState::Away => "away",
        PresenceState::Offline => "offline",
    }
}

fn parse_presence(s: &str) -> PresenceState {
    match s {
        "online" => PresenceState::Online,
        "away" => PresenceState::Away,
        _ => PresenceState::Offline,
    }
}

fn row_to_student(row: &PgRow) -> Result<Student, sqlx::Error> {
    let prefs: serde_json::Value = row.try_get("prefs")?;
    let prefs: NotificationPrefs = serde_json::from_value(prefs).unwrap_or_default();
    let status: String = row.try_get("status")?;
    let presence: String = row.try_get("presence")?;
    Ok(Student {
        id: StudentId::new(row.try_get::<String, _>("id")?),
        principal_id: row.try_get::<Option<i64>, _>("principal_id")?,
        login: row.try_get("login")?,
        display_name: row.try_get("display_name")?,
        cohort: row.try_get("cohort")?,
        status: parse_status(&status),
        xp: row.try_get::<i64, _>("xp")?.max(0) as u64,
        presence: parse_presence(&presence),
        last_seen_at: row.try_get("last_seen_at")?,
        last_synced_at: row.try_get("last_synced_at")?,
        prefs,
        helper_rating: row.try_get("helper_rating")?,
        help_count: row.try_get::<i32, _>("help_count")?.max(0) as u32,
        available_for_help: row.try_get("available_for_help")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const SELECT_STUDENT: &str = "SELECT id, principal_id, login, display_name, cohort, status, xp, \
     presence, last_seen_at, last_synced_at, prefs, helper_rating, help_count, \
     available_for_help, created_at, updated_at FROM students";

#[derive(Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly-observed student or refresh sync-owned fields.
    pub async fn upsert_from_sync(&self, student: &Student) -> Result<(), DomainError> {
        let prefs = serde_json::to_value(&student.prefs)
            .map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        sqlx::query(
            "INSERT INTO students (id, principal_id, login, display_name, cohort, status, xp, \
             presence, last_seen_at, last_synced_at, prefs, helper_rating, help_count, \
             available_for_help, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (id) DO UPDATE SET \
               login = EXCLUDED.login, \
               display_name = EXCLUDED.display_name, \
               cohort = EXCLUDED.cohort, \
               last_synced_at = EXCLUDED.last_synced_at, \
               updated_at = EXCLUDED.updated_at",
        )
        .bind(student.id.as_str())
        .bind(student.principal_id)
        .bind(&student.login)
        .bind(&student.display_name)
        .bind(&student.cohort)
        .bind(status_str(student.status))
        .bind(student.xp as i64)
        .bind(presence_str(student.presence))
        .bind(student.last_seen_at)
        .bind(student.last_synced_at)
        .bind(prefs)
        .bind(student.helper_rating)
        .bind(student.help_count as i32)
        .bind(student.available_for_help)
        .bind(student.created_at)
        .bind(student.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn find(&self, id: &StudentId) -> Result<Option<Student>, DomainError> {
        let row = sqlx::query(&format!("{SELECT_STUDENT} WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_student).transpose().map_err(map_sqlx_error)
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<Student>, DomainError> {
        let row = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE login = $1 AND status = 'active'"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_student).transpose().map_err(map_sqlx_error)
    }

    pub async fn find_by_principal(&self, principal_id: i64) -> Result<Option<Student>, DomainError> {
        let row = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE principal_id = $1 AND status = 'active'"
        ))
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_student).transpose().map_err(map_sqlx_error)
    }

    /// Active students, optionally restricted to one cohort.
    pub async fn list_active(&self, cohort: Option<&str>) -> Result<Vec<Student>, DomainError> {
        let rows = match cohort {
            Some(cohort) => {
                sqlx::query(&format!(
                    "{SELECT_STUDENT} WHERE status = 'active' AND cohort = $1 ORDER BY xp DESC, display_name ASC"
                ))
                .bind(cohort)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "{SELECT_STUDENT} WHERE status = 'active' ORDER BY xp DESC, display_name ASC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_student).collect::<Result<_, _>>().map_err(map_sqlx_error)
    }

    /// Connect a chat principal to a student account. The partial unique
    /// index turns a double-link into a conflict.
    pub async fn link_principal(
        &self,
        id: &StudentId,
        principal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE students SET principal_id = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_str())
                .bind(principal_id)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("student {id}")));
        }
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: &StudentId,
        status: StudentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE students SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_str())
            .bind(status_str(status))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("student {id}")));
        }
        Ok(())
    }

    pub async fn touch_last_seen(
        &self,
        id: &StudentId,
        state: PresenceState,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE students SET presence = $2, last_seen_at = $3, updated_at = $3 WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(presence_str(state))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn update_helper_fields(
        &self,
        id: &StudentId,
        available: bool,
        rating: f32,
        help_count: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE students SET available_for_help = $2, helper_rating = $3, \
             help_count = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(available)
        .bind(rating.clamp(0.0, 5.0))
        .bind(help_count as i32)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Apply an XP change and append the history row in one transaction.
    ///
    /// Decreases require a non-empty reason; increases default their
    /// reason to `"sync"` when none is given.
    pub async fn record_xp_change(
        &self,
        id: &StudentId,
        new_xp: u64,
        reason: Option<&str>,
        task_id: Option<&TaskId>,
        now: DateTime<Utc>,
    ) -> Result<Option<XpHistoryEntry>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let old_xp: i64 = sqlx::query_scalar("SELECT xp FROM students WHERE id = $1 FOR UPDATE")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| DomainError::NotFound(format!("student {id}")))?;
        let old_xp = old_xp.max(0) as u64;

        if new_xp == old_xp {
            return Ok(None);
        }
        let reason = match (new_xp < old_xp, reason) {
            (true, None) => {
                return Err(DomainError::InvalidInput(format!(
                    "xp decrease for {id} requires a reason"
                )))
            }
            (_, Some(reason)) => reason,
            (false, None) => "sync",
        };

        sqlx::query("UPDATE students SET xp = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_str())
            .bind(new_xp as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let entry = XpHistoryEntry::new(
            id.clone(),
            old_xp,
            new_xp,
            reason,
            task_id.cloned(),
            now,
        );
        sqlx::query(
            "INSERT INTO xp_history (student_id, old_xp, new_xp, delta, reason, task_id, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.student_id.as_str())
        .bind(entry.old_xp as i64)
        .bind(entry.new_xp as i64)
        .bind(entry.delta)
        .bind(&entry.reason)
        .bind(entry.task_id.as_ref().map(|t| t.as_str()))
        .bind(entry.recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(student = %id, old_xp, new_xp, "xp change recorded");
        Ok(Some(entry))
    }

    /// Recent XP history, newest first.
    pub async fn xp_history(
        &self,
        id: &StudentId,
        limit: i64,
    ) -> Result<Vec<XpHistoryEntry>, DomainError> {
        let rows = sqlx::query(
            "SELECT student_id, old_xp, new_xp, delta, reason, task_id, recorded_at \
             FROM xp_history WHERE student_id = $1 ORDER BY recorded_at DESC LIMIT $2",
        )
        .bind(id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<XpHistoryEntry, sqlx::Error> {
                Ok(XpHistoryEntry {
                    student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
                    old_xp: row.try_get::<i64, _>("old_xp")?.max(0) as u64,
                    new_xp: row.try_get::<i64, _>("new_xp")?.max(0) as u64,
                    delta: row.try_get("delta")?,
                    reason: row.try_get("reason")?,
                    task_id: row
                        .try_get::<Option<String>, _>("task_id")?
                        .map(TaskId::new),
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect::<Result<_, _>>()
            .map_err(map_sqlx_error)
    }

    /// Students with no activity since `cutoff`, for inactivity flagging.
    pub async fn list_inactive_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Student>, DomainError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE status = 'active' \
             AND (last_seen_at IS NULL OR last_seen_at < $1) \
             AND (last_synced_at IS NULL OR last_synced_at < $1)"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_student).collect::<Result<_, _>>().map_err(map_sqlx_error)
    }
}

#[cfg(test)]
#[path = "students_tests.rs"]
mod tests;
