// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled jobs: platform sync, leaderboard rebuild, inactivity
//! flagging, cleanup, daily digest.
//!
//! Jobs drive repositories and publish domain events; the dispatcher's
//! handlers fan those into the view, cache, and notifications. Event
//! payloads carry the display fields handlers need so they never have to
//! read back from the database.

use crate::config::SchedulerSettings;
use chrono::Utc;
use hearth_bus::EventBus;
use hearth_core::{
    DailyGrind, DomainError, DomainEvent, EventType, IdGen, SnapshotId, Streak, StreakOutcome,
    Student, StudentId, StudentStatus, TaskCompletion, TaskId, Tz, UuidIdGen, ALL_COHORTS,
    XP_PER_LEVEL,
};
use hearth_integrations::{ChatClient, PlatformClient, PlatformProgress};
use hearth_leaderboard::{build_snapshot, LeaderboardCache, LeaderboardView};
use hearth_presence::PresenceTracker;
use hearth_scheduler::{job_fn, JobSpec, Schedule};
use hearth_storage::{ProgressRepository, SnapshotRepository, StudentRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the jobs share.
#[derive(Clone)]
pub struct JobContext {
    pub students: Arc<StudentRepository>,
    pub progress: Arc<ProgressRepository>,
    pub snapshots: Arc<SnapshotRepository>,
    pub platform: Arc<PlatformClient>,
    pub chat: Arc<ChatClient>,
    pub bus: Arc<dyn EventBus>,
    pub view: Arc<LeaderboardView>,
    pub cache: Arc<LeaderboardCache>,
    pub presence: Arc<PresenceTracker>,
    pub tz: Tz,
    pub cohorts: Vec<String>,
    pub digest_chat_id: Option<i64>,
}

impl JobContext {
    async fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.bus.publish(event).await {
            if err != DomainError::Closed {
                warn!(error = %err, "job event publish failed");
            }
        }
    }
}

/// Fold one student's platform progress into the database, publishing
/// the resulting domain events.
async fn sync_one(ctx: &JobContext, report: &PlatformProgress) -> Result<(), DomainError> {
    let now = Utc::now();
    let cohort = report.cohort.clone().unwrap_or_else(|| ALL_COHORTS.to_string());

    let (student, is_new) = match ctx.students.find_by_login(&report.login).await? {
        Some(student) => (student, false),
        None => {
            let clock = hearth_core::SystemClock;
            let id = StudentId::new(UuidIdGen.next());
            // Principal id arrives later, when the student links their chat
            // account; until then the platform login is the only identity.
            let student =
                Student::new(id, None, &report.login, &report.display_name, &cohort, &clock);
            ctx.students.upsert_from_sync(&student).await?;
            (student, true)
        }
    };

    if is_new {
        ctx.publish(
            DomainEvent::at(EventType::StudentRegistered, student.id.as_str(), now)
                .with("login", student.login.clone())
                .with("display_name", student.display_name.clone())
                .with("cohort", student.cohort.clone()),
        )
        .await;
    } else {
        // Refresh sync-owned display fields
        let mut refreshed = student.clone();
        refreshed.display_name = if report.display_name.is_empty() {
            student.display_name.clone()
        } else {
            report.display_name.clone()
        };
        refreshed.cohort = cohort.clone();
        refreshed.last_synced_at = Some(now);
        refreshed.updated_at = now;
        ctx.students.upsert_from_sync(&refreshed).await?;
    }

    // Task completions (idempotent per student+task)
    let mut new_completions = 0u32;
    for task in &report.completed_tasks {
        let Some(completed_at) = task.completed_at else {
            continue;
        };
        let completion = TaskCompletion {
            student_id: student.id.clone(),
            task_id: TaskId::new(task.id.clone()),
            task_name: task.name.clone(),
            xp_earned: task.xp,
            completed_at,
        };
        if ctx.progress.record_completion(&completion).await? {
            new_completions += 1;
            ctx.publish(
                DomainEvent::at(EventType::TaskCompleted, student.id.as_str(), now)
                    .with("task_id", task.id.clone())
                    .with("task_name", task.name.clone())
                    .with("xp_earned", task.xp),
            )
            .await;
        }
    }

    // Streak bookkeeping on any observed activity today
    let today = ctx.tz.local_date(now);
    let mut streak = ctx.progress.streak(&student.id).await?;
    let had_activity = report.xp > student.xp || new_completions > 0;
    if had_activity {
        match streak.record_activity(today) {
            StreakOutcome::Extended | StreakOutcome::Started => {
                ctx.progress.save_streak(&streak).await?;
                ctx.publish(
                    DomainEvent::at(EventType::StreakExtended, student.id.as_str(), now)
                        .with("current", streak.current)
                        .with("best", streak.best),
                )
                .await;
            }
            StreakOutcome::Unchanged => {}
        }
    } else if streak.current > 0 && streak.is_broken_as_of(today) {
        let broken = Streak {
            current: 0,
            ..streak.clone()
        };
        ctx.progress.save_streak(&broken).await?;
        ctx.publish(
            DomainEvent::at(EventType::StreakBroken, student.id.as_str(), now)
                .with("best", broken.best),
        )
        .await;
        streak = broken;
    }

    // Daily grind upsert
    let mut grind = match ctx.progress.daily_grind(&student.id, today).await? {
        Some(grind) => grind,
        None if had_activity => DailyGrind::open(
            student.id.clone(),
            today,
            student.xp,
            None,
            streak.current.max(1),
            now,
        ),
        None => return finish_xp(ctx, &student, report, 0, 0, streak.current, now).await,
    };
    grind.record_activity(report.xp, None, now);
    for _ in 0..new_completions {
        grind.record_task_completed();
    }
    ctx.progress.upsert_daily_grind(&grind).await?;

    finish_xp(
        ctx,
        &student,
        report,
        grind.xp_gained,
        grind.tasks_completed,
        grind.streak_day,
        now,
    )
    .await
}

/// Record the XP change (if any) and publish the xp/level events.
async fn finish_xp(
    ctx: &JobContext,
    student: &Student,
    report: &PlatformProgress,
    xp_gained_today: u64,
    tasks_completed_today: u32,
    streak_day: u32,
    now: chrono::DateTime<Utc>,
) -> Result<(), DomainError> {
    if report.xp == student.xp {
        return Ok(());
    }
    // Platform corrections go down with an explicit reason
    let reason = if report.xp < student.xp {
        Some("platform correction")
    } else {
        None
    };
    let Some(entry) = ctx
        .students
        .record_xp_change(&student.id, report.xp, reason, None, now)
        .await?
    else {
        return Ok(());
    };

    ctx.publish(
        DomainEvent::at(EventType::XpGained, student.id.as_str(), now)
            .with("login", student.login.clone())
            .with("display_name", student.display_name.clone())
            .with("cohort", student.cohort.clone())
            .with("old_xp", entry.old_xp)
            .with("new_xp", entry.new_xp)
            .with("delta", entry.delta)
            .with("xp_gained_today", xp_gained_today)
            .with("tasks_completed_today", tasks_completed_today as u64)
            .with("streak_day", streak_day as u64),
    )
    .await;

    let old_level = entry.old_xp / XP_PER_LEVEL;
    let new_level = entry.new_xp / XP_PER_LEVEL;
    if new_level > old_level {
        ctx.publish(
            DomainEvent::at(EventType::LevelUp, student.id.as_str(), now)
                .with("level", new_level)
                .with("display_name", student.display_name.clone()),
        )
        .await;
    }
    Ok(())
}

/// `platform-sync`: pull progress for every configured cohort.
pub fn sync_job(ctx: JobContext, settings: &SchedulerSettings) -> JobSpec {
    let interval = settings.sync_interval;
    let timeout = settings.job_timeout;
    JobSpec::new(
        "platform-sync",
        Schedule::Interval(interval),
        job_fn(move || {
            let ctx = ctx.clone();
            async move {
                let cohorts = if ctx.cohorts.is_empty() {
                    vec![ALL_COHORTS.to_string()]
                } else {
                    ctx.cohorts.clone()
                };
                let mut synced = 0usize;
                for cohort in cohorts {
                    let reports = ctx.platform.get_cohort_progress(&cohort).await?;
                    for report in &reports {
                        if let Err(err) = sync_one(&ctx, report).await {
                            warn!(login = %report.login, error = %err, "student sync failed");
                        } else {
                            synced += 1;
                        }
                    }
                }
                info!(synced, "platform sync finished");
                Ok(())
            }
        }),
    )
    .describe("Pull student progress from the learning platform")
    .with_timeout(timeout)
}

/// `leaderboard-rebuild`: snapshot, persist, and re-project the ranking.
pub fn rebuild_job(ctx: JobContext, settings: &SchedulerSettings) -> JobSpec {
    let interval = settings.rebuild_interval;
    let timeout = settings.job_timeout;
    JobSpec::new(
        "leaderboard-rebuild",
        Schedule::Interval(interval),
        job_fn(move || {
            let ctx = ctx.clone();
            async move {
                let students = ctx.students.list_active(None).await?;
                // Snapshot entries drop the chat identity and preferences;
                // keep them around for the rank-change notifications
                let chat_links: HashMap<StudentId, (Option<i64>, bool)> = students
                    .iter()
                    .map(|s| (s.id.clone(), (s.principal_id, s.prefs.rank_changes)))
                    .collect();
                let previous = ctx.snapshots.latest_for_cohort(ALL_COHORTS).await?;
                let snapshot = build_snapshot(
                    SnapshotId::new(UuidIdGen.next()),
                    None,
                    students,
                    previous.as_ref(),
                    Utc::now(),
                );

                ctx.snapshots.save(&snapshot).await?;
                ctx.cache
                    .rebuild_from_snapshot(&snapshot)
                    .await
                    .map_err(|e| DomainError::Unavailable(e.to_string()))?;
                ctx.view.rebuild_from_snapshot(&snapshot);

                ctx.publish(
                    DomainEvent::new(EventType::LeaderboardRebuilt, snapshot.id.as_str())
                        .with("cohort", snapshot.cohort.clone())
                        .with("total_students", snapshot.total_students)
                        .with("total_xp", snapshot.total_xp),
                )
                .await;

                for entry in snapshot.entries.iter().filter(|e| e.rank_change != 0) {
                    let mut event =
                        DomainEvent::new(EventType::RankChanged, entry.student_id.as_str())
                            .with("display_name", entry.display_name.clone())
                            .with("new_rank", entry.rank)
                            .with("rank_change", entry.rank_change);
                    if let Some((principal_id, notify)) = chat_links.get(&entry.student_id) {
                        event = event.with("notify_rank_changes", *notify);
                        if let Some(principal_id) = principal_id {
                            event = event.with("principal_id", *principal_id);
                        }
                    }
                    ctx.publish(event).await;
                }

                info!(
                    snapshot = %snapshot.id,
                    students = snapshot.total_students,
                    "leaderboard rebuilt"
                );
                Ok(())
            }
        }),
    )
    .describe("Rebuild ranking snapshot, cache, and view")
    .with_timeout(timeout)
}

/// `inactivity-check`: flag students idle past the horizon.
pub fn inactivity_job(ctx: JobContext, settings: &SchedulerSettings) -> JobSpec {
    let interval = settings.inactivity_interval;
    let horizon = settings.inactivity_horizon;
    let timeout = settings.job_timeout;
    JobSpec::new(
        "inactivity-check",
        Schedule::Interval(interval),
        job_fn(move || {
            let ctx = ctx.clone();
            async move {
                let cutoff = Utc::now()
                    - chrono::Duration::from_std(horizon)
                        .unwrap_or_else(|_| chrono::Duration::days(14));
                let idle = ctx.students.list_inactive_since(cutoff).await?;
                for student in &idle {
                    ctx.students
                        .set_status(&student.id, StudentStatus::Inactive, Utc::now())
                        .await?;
                    ctx.publish(
                        DomainEvent::new(EventType::StudentUpdated, student.id.as_str())
                            .with("status", "inactive"),
                    )
                    .await;
                }
                if !idle.is_empty() {
                    info!(flagged = idle.len(), "inactive students flagged");
                }
                Ok(())
            }
        }),
    )
    .describe("Flag students with no recent activity")
    .with_timeout(timeout)
}

/// `cleanup`: drop old snapshots and stale presence entries.
pub fn cleanup_job(ctx: JobContext, settings: &SchedulerSettings) -> JobSpec {
    let interval = settings.cleanup_interval;
    let retention = settings.snapshot_retention;
    let timeout = settings.job_timeout;
    JobSpec::new(
        "cleanup",
        Schedule::Interval(interval),
        job_fn(move || {
            let ctx = ctx.clone();
            async move {
                let horizon = Utc::now()
                    - chrono::Duration::from_std(retention)
                        .unwrap_or_else(|_| chrono::Duration::days(30));
                let snapshots = ctx.snapshots.delete_older_than(horizon).await?;
                let presence = ctx
                    .presence
                    .cleanup_stale()
                    .await
                    .map_err(|e| DomainError::Unavailable(e.to_string()))?;
                debug!(snapshots, presence, "cleanup finished");
                Ok(())
            }
        }),
    )
    .describe("Delete expired snapshots and stale presence entries")
    .with_timeout(timeout)
}

/// `daily-digest`: render and deliver the digest at the configured slot.
pub fn digest_job(
    ctx: JobContext,
    settings: &SchedulerSettings,
) -> Result<JobSpec, DomainError> {
    let expr = hearth_scheduler::CronExpr::parse(&format!(
        "{} {} * * *",
        settings.digest_minute, settings.digest_hour
    ))
    .map_err(|e| DomainError::InvalidInput(e.to_string()))?;
    let timeout = settings.job_timeout;

    Ok(JobSpec::new(
        "daily-digest",
        Schedule::Cron(expr),
        job_fn(move || {
            let ctx = ctx.clone();
            async move {
                let top = ctx.view.get_top(10);
                let online = ctx.view.online_count();
                let total = ctx.view.len();
                let text = crate::digest::render_digest(&top, online, total);

                ctx.publish(
                    DomainEvent::new(EventType::DailyDigest, ALL_COHORTS)
                        .with("students", total as u64)
                        .with("online", online as u64),
                )
                .await;

                match ctx.digest_chat_id {
                    Some(chat_id) => ctx.chat.send_message(chat_id, &text).await,
                    None => {
                        debug!("no digest chat configured; digest event only");
                        Ok(())
                    }
                }
            }
        }),
    )
    .describe("Send the daily grind digest")
    .with_timeout(timeout))
}
