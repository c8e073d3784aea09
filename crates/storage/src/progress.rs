// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress repository: daily grinds, streaks, achievements, completions.

use crate::db::map_sqlx_error;
use chrono::NaiveDate;
use hearth_core::{
    Achievement, DailyGrind, DomainError, Streak, StudentId, TaskCompletion, TaskId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

fn row_to_grind(row: &PgRow) -> Result<DailyGrind, sqlx::Error> {
    Ok(DailyGrind {
        student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
        day: row.try_get("day")?,
        xp_start: row.try_get::<i64, _>("xp_start")?.max(0) as u64,
        xp_current: row.try_get::<i64, _>("xp_current")?.max(0) as u64,
        xp_gained: row.try_get::<i64, _>("xp_gained")?.max(0) as u64,
        tasks_completed: row.try_get::<i32, _>("tasks_completed")?.max(0) as u32,
        session_count: row.try_get::<i32, _>("session_count")?.max(0) as u32,
        session_minutes: row.try_get::<i32, _>("session_minutes")?.max(0) as u32,
        first_activity_at: row.try_get("first_activity_at")?,
        last_activity_at: row.try_get("last_activity_at")?,
        rank_start: row.try_get::<Option<i32>, _>("rank_start")?.map(|r| r.max(0) as u32),
        rank_current: row.try_get::<Option<i32>, _>("rank_current")?.map(|r| r.max(0) as u32),
        rank_change: row.try_get("rank_change")?,
        streak_day: row.try_get::<i32, _>("streak_day")?.max(0) as u32,
    })
}

const SELECT_GRIND: &str = "SELECT student_id, day, xp_start, xp_current, xp_gained, \
     tasks_completed, session_count, session_minutes, first_activity_at, last_activity_at, \
     rank_start, rank_current, rank_change, streak_day FROM daily_grinds";

const INSERT_ACHIEVEMENT: &str =
    "INSERT INTO achievements (student_id, kind, unlocked_at, metadata) \
     VALUES ($1, $2, $3, $4) ON CONFLICT (student_id, kind) DO NOTHING";

const INSERT_COMPLETION: &str =
    "INSERT INTO task_completions (student_id, task_id, task_name, xp_earned, completed_at) \
     VALUES ($1, $2, $3, $4, $5) ON CONFLICT (student_id, task_id) DO NOTHING";

#[derive(Clone)]
pub struct ProgressRepository {
    pool: PgPool,
}

impl ProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // -- daily grinds -------------------------------------------------------

    /// Upsert the (student, day) grind row.
    pub async fn upsert_daily_grind(&self, grind: &DailyGrind) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO daily_grinds (student_id, day, xp_start, xp_current, xp_gained, \
             tasks_completed, session_count, session_minutes, first_activity_at, \
             last_activity_at, rank_start, rank_current, rank_change, streak_day) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (student_id, day) DO UPDATE SET \
               xp_current = EXCLUDED.xp_current, \
               xp_gained = EXCLUDED.xp_gained, \
               tasks_completed = EXCLUDED.tasks_completed, \
               session_count = EXCLUDED.session_count, \
               session_minutes = EXCLUDED.session_minutes, \
               last_activity_at = EXCLUDED.last_activity_at, \
               rank_current = EXCLUDED.rank_current, \
               rank_change = EXCLUDED.rank_change, \
               streak_day = EXCLUDED.streak_day",
        )
        .bind(grind.student_id.as_str())
        .bind(grind.day)
        .bind(grind.xp_start as i64)
        .bind(grind.xp_current as i64)
        .bind(grind.xp_gained as i64)
        .bind(grind.tasks_completed as i32)
        .bind(grind.session_count as i32)
        .bind(grind.session_minutes as i32)
        .bind(grind.first_activity_at)
        .bind(grind.last_activity_at)
        .bind(grind.rank_start.map(|r| r as i32))
        .bind(grind.rank_current.map(|r| r as i32))
        .bind(grind.rank_change)
        .bind(grind.streak_day as i32)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn daily_grind(
        &self,
        student_id: &StudentId,
        day: NaiveDate,
    ) -> Result<Option<DailyGrind>, DomainError> {
        let row = sqlx::query(&format!(
            "{SELECT_GRIND} WHERE student_id = $1 AND day = $2"
        ))
        .bind(student_id.as_str())
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_grind).transpose().map_err(map_sqlx_error)
    }

    /// Everyone's grind rows for one day, for digest assembly.
    pub async fn grinds_for_day(&self, day: NaiveDate) -> Result<Vec<DailyGrind>, DomainError> {
        let rows = sqlx::query(&format!(
            "{SELECT_GRIND} WHERE day = $1 ORDER BY xp_gained DESC"
        ))
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_grind).collect::<Result<_, _>>().map_err(map_sqlx_error)
    }

    // -- streaks ------------------------------------------------------------

    pub async fn streak(&self, student_id: &StudentId) -> Result<Streak, DomainError> {
        let row = sqlx::query(
            "SELECT student_id, current, best, last_active_day, started_on \
             FROM streaks WHERE student_id = $1",
        )
        .bind(student_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            None => Ok(Streak::new(student_id.clone())),
            Some(row) => (|| -> Result<Streak, sqlx::Error> {
                Ok(Streak {
                    student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
                    current: row.try_get::<i32, _>("current")?.max(0) as u32,
                    best: row.try_get::<i32, _>("best")?.max(0) as u32,
                    last_active_day: row.try_get("last_active_day")?,
                    started_on: row.try_get("started_on")?,
                })
            })()
            .map_err(map_sqlx_error),
        }
    }

    /// Persist a streak. The `best >= current` invariant is also enforced
    /// by a check constraint.
    pub async fn save_streak(&self, streak: &Streak) -> Result<(), DomainError> {
        if streak.current > streak.best {
            return Err(DomainError::Integrity(format!(
                "streak current {} exceeds best {}",
                streak.current, streak.best
            )));
        }
        sqlx::query(
            "INSERT INTO streaks (student_id, current, best, last_active_day, started_on) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (student_id) DO UPDATE SET \
               current = EXCLUDED.current, \
               best = EXCLUDED.best, \
               last_active_day = EXCLUDED.last_active_day, \
               started_on = EXCLUDED.started_on",
        )
        .bind(streak.student_id.as_str())
        .bind(streak.current as i32)
        .bind(streak.best as i32)
        .bind(streak.last_active_day)
        .bind(streak.started_on)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    // -- achievements -------------------------------------------------------

    /// Record an unlock. Returns false when already unlocked.
    pub async fn unlock_achievement(&self, achievement: &Achievement) -> Result<bool, DomainError> {
        let metadata = serde_json::to_value(&achievement.metadata)
            .map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        let result = sqlx::query(INSERT_ACHIEVEMENT)
            .bind(achievement.student_id.as_str())
            .bind(&achievement.kind)
            .bind(achievement.unlocked_at)
            .bind(metadata)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn achievements(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Achievement>, DomainError> {
        let rows = sqlx::query(
            "SELECT student_id, kind, unlocked_at, metadata FROM achievements \
             WHERE student_id = $1 ORDER BY unlocked_at",
        )
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<Achievement, sqlx::Error> {
                let metadata: serde_json::Value = row.try_get("metadata")?;
                Ok(Achievement {
                    student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
                    kind: row.try_get("kind")?,
                    unlocked_at: row.try_get("unlocked_at")?,
                    metadata: serde_json::from_value(metadata).unwrap_or_default(),
                })
            })
            .collect::<Result<_, _>>()
            .map_err(map_sqlx_error)
    }

    // -- task completions ---------------------------------------------------

    /// Record a completion. Idempotent on (student, task); returns false
    /// on the duplicate.
    pub async fn record_completion(
        &self,
        completion: &TaskCompletion,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(INSERT_COMPLETION)
            .bind(completion.student_id.as_str())
            .bind(completion.task_id.as_str())
            .bind(&completion.task_name)
            .bind(completion.xp_earned as i64)
            .bind(completion.completed_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// Students who completed a task, for the helper index.
    pub async fn completions_for_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<StudentId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT student_id FROM task_completions WHERE task_id = $1",
        )
        .bind(task_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(ids.into_iter().map(StudentId::new).collect())
    }

    pub async fn completions_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<TaskCompletion>, DomainError> {
        let rows = sqlx::query(
            "SELECT student_id, task_id, task_name, xp_earned, completed_at \
             FROM task_completions WHERE student_id = $1 ORDER BY completed_at",
        )
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<TaskCompletion, sqlx::Error> {
                Ok(TaskCompletion {
                    student_id: StudentId::new(row.try_get::<String, _>("student_id")?),
                    task_id: TaskId::new(row.try_get::<String, _>("task_id")?),
                    task_name: row.try_get("task_name")?,
                    xp_earned: row.try_get::<i64, _>("xp_earned")?.max(0) as u64,
                    completed_at: row.try_get("completed_at")?,
                })
            })
            .collect::<Result<_, _>>()
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
