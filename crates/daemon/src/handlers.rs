// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher registrations: domain events into view, cache, and chat
//! side effects.
//!
//! Handlers read what they need from the event payload so they stay free
//! of repository round-trips; the sync pipeline and rebuild job put the
//! display fields on the events they publish.

use hearth_bus::{handler_fn, Dispatcher, HandlerError, HandlerRegistration, RetryPolicy};
use hearth_core::{DomainEvent, EventType, StudentId, TaskId, XP_PER_LEVEL};
use hearth_integrations::ChatClient;
use hearth_leaderboard::{DailyStats, LeaderboardCache, LeaderboardView, ViewEntry};
use hearth_core::SnapshotEntry;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

fn entry_from_event(event: &DomainEvent) -> ViewEntry {
    let id = StudentId::new(event.aggregate_id.clone());
    ViewEntry {
        login: event.payload_str("login").unwrap_or_default().to_string(),
        display_name: event
            .payload_str("display_name")
            .unwrap_or(event.aggregate_id.as_str())
            .to_string(),
        cohort: event.payload_str("cohort").unwrap_or("all").to_string(),
        rank: 0,
        cohort_rank: 0,
        xp: event.payload_u64("new_xp").unwrap_or_default(),
        level: (event.payload_u64("new_xp").unwrap_or_default() / XP_PER_LEVEL) as u32,
        online: event.payload_bool("online").unwrap_or(false),
        available_for_help: false,
        helper_rating: 0.0,
        help_count: 0,
        today: None,
        streak: 0,
        achievements: Vec::new(),
        top_endorsements: Vec::new(),
        student_id: id,
    }
}

fn cache_entry(view_entry: &ViewEntry) -> SnapshotEntry {
    SnapshotEntry {
        student_id: view_entry.student_id.clone(),
        login: view_entry.login.clone(),
        display_name: view_entry.display_name.clone(),
        rank: view_entry.rank,
        xp: view_entry.xp,
        level: view_entry.level,
        rank_change: 0,
        online: view_entry.online,
        available_for_help: view_entry.available_for_help,
        helper_rating: view_entry.helper_rating,
        help_count: view_entry.help_count,
    }
}

/// Hook the view and cache to the event stream.
pub fn register_projection_handlers(
    dispatcher: &Dispatcher,
    view: Arc<LeaderboardView>,
    cache: Arc<LeaderboardCache>,
) {
    // XP changes re-rank the view and refresh the hot cache
    {
        let view = Arc::clone(&view);
        let cache = Arc::clone(&cache);
        dispatcher.register(
            EventType::XpGained,
            HandlerRegistration::new(
                "projection-xp",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    let cache = Arc::clone(&cache);
                    async move {
                        let id = StudentId::new(event.aggregate_id.clone());
                        let mut entry = view
                            .get_by_student(&id)
                            .unwrap_or_else(|| entry_from_event(&event));
                        if let Some(xp) = event.payload_u64("new_xp") {
                            entry.xp = xp;
                            entry.level = (xp / XP_PER_LEVEL) as u32;
                        }
                        let cohort = entry.cohort.clone();
                        view.update_entry(entry.clone());
                        cache
                            .update_entry(&cohort, &cache_entry(&entry))
                            .await
                            .map_err(|e| {
                                HandlerError::Domain(hearth_core::DomainError::Unavailable(
                                    e.to_string(),
                                ))
                            })?;
                        debug!(student = %event.aggregate_id, "projection updated");
                        Ok(())
                    }
                }),
            )
            .with_timeout(Duration::from_secs(10)),
        );
    }

    // Daily-grind stats ride on the same xp event when present
    {
        let view = Arc::clone(&view);
        dispatcher.register(
            EventType::XpGained,
            HandlerRegistration::new(
                "projection-daily",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        if let Some(gained) = event.payload_u64("xp_gained_today") {
                            view.update_daily_progress(
                                &StudentId::new(event.aggregate_id.clone()),
                                DailyStats {
                                    xp_gained: gained,
                                    tasks_completed: event
                                        .payload_u64("tasks_completed_today")
                                        .unwrap_or_default()
                                        as u32,
                                    streak_day: event
                                        .payload_u64("streak_day")
                                        .unwrap_or_default()
                                        as u32,
                                },
                            );
                        }
                        Ok(())
                    }
                }),
            ),
        );
    }

    // Completions feed the helper index
    {
        let view = Arc::clone(&view);
        dispatcher.register(
            EventType::TaskCompleted,
            HandlerRegistration::new(
                "projection-task",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        if let Some(task) = event.payload_str("task_id") {
                            view.add_task_completion(
                                &StudentId::new(event.aggregate_id.clone()),
                                TaskId::new(task),
                            );
                        }
                        Ok(())
                    }
                }),
            ),
        );
    }

    // Presence transitions flip the online flag
    for (event_type, online) in [
        (EventType::WentOnline, true),
        (EventType::WentAway, false),
        (EventType::WentOffline, false),
    ] {
        let view = Arc::clone(&view);
        dispatcher.register(
            event_type.clone(),
            HandlerRegistration::new(
                format!("projection-{}", event_type.as_str()),
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        view.update_online_status(
                            &StudentId::new(event.aggregate_id.clone()),
                            online,
                        );
                        Ok(())
                    }
                }),
            )
            .with_retry(RetryPolicy::none()),
        );
    }

    // Streaks
    {
        let view = Arc::clone(&view);
        dispatcher.register(
            EventType::StreakExtended,
            HandlerRegistration::new(
                "projection-streak",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        if let Some(current) = event.payload_u64("current") {
                            view.update_streak(
                                &StudentId::new(event.aggregate_id.clone()),
                                current as u32,
                            );
                        }
                        Ok(())
                    }
                }),
            ),
        );
    }
    {
        let view = Arc::clone(&view);
        dispatcher.register(
            EventType::StreakBroken,
            HandlerRegistration::new(
                "projection-streak-broken",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        view.update_streak(&StudentId::new(event.aggregate_id.clone()), 0);
                        Ok(())
                    }
                }),
            ),
        );
    }

    // Achievements merge into the entry
    {
        let view = Arc::clone(&view);
        dispatcher.register(
            EventType::AchievementUnlocked,
            HandlerRegistration::new(
                "projection-achievement",
                handler_fn(move |event: DomainEvent| {
                    let view = Arc::clone(&view);
                    async move {
                        let id = StudentId::new(event.aggregate_id.clone());
                        if let (Some(kind), Some(mut entry)) =
                            (event.payload_str("kind"), view.get_by_student(&id))
                        {
                            if !entry.achievements.iter().any(|a| a == kind) {
                                entry.achievements.push(kind.to_string());
                                view.update_entry(entry);
                            }
                        }
                        Ok(())
                    }
                }),
            ),
        );
    }
}

/// Send rank-change notifications through the chat API.
///
/// Runs async with retries: a chat hiccup must not fail the dispatch.
pub fn register_notification_handlers(dispatcher: &Dispatcher, chat: Arc<ChatClient>) {
    dispatcher.register(
        EventType::RankChanged,
        HandlerRegistration::new(
            "notify-rank-change",
            handler_fn(move |event: DomainEvent| {
                let chat = Arc::clone(&chat);
                async move {
                    // The student opted out of rank-change notifications
                    if !event.payload_bool("notify_rank_changes").unwrap_or(false) {
                        return Ok(());
                    }
                    // No linked chat account, nowhere to deliver
                    let Some(principal) = event.payload_i64("principal_id") else {
                        return Ok(());
                    };
                    let Some(change) = event.payload_i64("rank_change") else {
                        return Ok(());
                    };
                    let rank = event.payload_u64("new_rank").unwrap_or_default();
                    let text = if change > 0 {
                        format!("You climbed {change} place(s) — now rank #{rank}!")
                    } else {
                        format!("You slipped to rank #{rank}. Time to grind!")
                    };
                    chat.send_message(principal, &text)
                        .await
                        .map_err(HandlerError::Domain)?;
                    Ok(())
                }
            }),
        )
        .asynchronous()
        .with_timeout(Duration::from_secs(15)),
    );
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
