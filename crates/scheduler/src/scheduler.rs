// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job registry and tick loop.
//!
//! One loop computes the nearest deadline and fires due jobs onto a
//! bounded concurrency limiter. A job never overlaps itself: while a run
//! is in flight the job cannot come due again. Handler panics are caught
//! and surfaced through the error hook; the loop never crashes.

use crate::cron::CronExpr;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use hearth_core::{Clock, DomainError, SystemClock, Tz};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// When a job should fire.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// `next = last + interval`.
    Interval(Duration),
    /// Five-field cron in the scheduler's timezone.
    Cron(CronExpr),
}

impl Schedule {
    fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        match self {
            Self::Interval(interval) => {
                Some(after + chrono::Duration::from_std(*interval).ok()?)
            }
            Self::Cron(expr) => expr.next_after(after, tz),
        }
    }
}

/// A job body.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self) -> Result<(), DomainError>;
}

struct FnJob<F>(F);

#[async_trait]
impl<F, Fut> JobHandler for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DomainError>> + Send,
{
    async fn run(&self) -> Result<(), DomainError> {
        (self.0)().await
    }
}

/// Wrap an async closure as a [`JobHandler`].
pub fn job_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DomainError>> + Send + 'static,
{
    Arc::new(FnJob(f))
}

/// A registered job.
pub struct JobSpec {
    pub name: String,
    pub description: String,
    pub schedule: Schedule,
    /// Per-run timeout.
    pub timeout: Duration,
    pub handler: Arc<dyn JobHandler>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, schedule: Schedule, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            schedule,
            timeout: Duration::from_secs(300),
            handler,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Record of one finished run.
#[derive(Debug, Clone)]
pub struct JobRun {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
}

/// Per-instance lifecycle callbacks, invoked inline.
#[derive(Default)]
pub struct SchedulerHooks {
    pub on_start: Option<Box<dyn Fn(&str) + Send + Sync>>,
    pub on_complete: Option<Box<dyn Fn(&JobRun) + Send + Sync>>,
    pub on_error: Option<Box<dyn Fn(&str, &DomainError) + Send + Sync>>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    /// Bounded run-history ring.
    pub history_limit: usize,
    pub tz: Tz,
    /// Upper bound on loop sleep, so new registrations are noticed.
    pub tick: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            history_limit: 1000,
            tz: Tz::utc(),
            tick: Duration::from_secs(1),
        }
    }
}

struct JobEntry {
    spec: Arc<JobSpec>,
    next_fire: DateTime<Utc>,
}

struct Inner<C: Clock> {
    config: SchedulerConfig,
    clock: C,
    jobs: Mutex<HashMap<String, JobEntry>>,
    running: Mutex<HashSet<String>>,
    history: Mutex<VecDeque<JobRun>>,
    hooks: Mutex<SchedulerHooks>,
    limiter: Arc<Semaphore>,
    stopping: AtomicBool,
    shutdown: Notify,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Interval/cron job runner.
#[derive(Clone)]
pub struct Scheduler<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl Scheduler<SystemClock> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(config: SchedulerConfig, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                config,
                clock,
                jobs: Mutex::new(HashMap::new()),
                running: Mutex::new(HashSet::new()),
                history: Mutex::new(VecDeque::new()),
                hooks: Mutex::new(SchedulerHooks::default()),
                stopping: AtomicBool::new(false),
                shutdown: Notify::new(),
                loop_handle: Mutex::new(None),
            }),
        }
    }

    /// Register a job; its first fire is one schedule step from now.
    pub fn register(&self, spec: JobSpec) -> Result<(), DomainError> {
        let now = self.inner.clock.now_utc();
        let next_fire = spec
            .schedule
            .next_after(now, self.inner.config.tz)
            .ok_or_else(|| DomainError::InvalidInput(format!("unschedulable job {}", spec.name)))?;

        let mut jobs = self.inner.jobs.lock();
        if jobs.contains_key(&spec.name) {
            return Err(DomainError::AlreadyExists(spec.name));
        }
        debug!(job = %spec.name, %next_fire, "job registered");
        jobs.insert(
            spec.name.clone(),
            JobEntry {
                spec: Arc::new(spec),
                next_fire,
            },
        );
        Ok(())
    }

    pub fn remove(&self, name: &str) -> bool {
        self.inner.jobs.lock().remove(name).is_some()
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.jobs.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_hooks(&self, hooks: SchedulerHooks) {
        *self.inner.hooks.lock() = hooks;
    }

    /// Finished runs, oldest first, bounded by the history limit.
    pub fn history(&self) -> Vec<JobRun> {
        self.inner.history.lock().iter().cloned().collect()
    }

    /// Jobs currently in flight.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.running.lock().iter().cloned().collect();
        names.sort();
        names
    }

    /// Due jobs as of `now`: not already running, next-fire passed.
    /// Marks them running and advances their next fire time.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<Arc<JobSpec>> {
        let mut jobs = self.inner.jobs.lock();
        let mut running = self.inner.running.lock();
        let mut due = Vec::new();
        for entry in jobs.values_mut() {
            if entry.next_fire > now || running.contains(&entry.spec.name) {
                continue;
            }
            if let Some(next) = entry.spec.schedule.next_after(now, self.inner.config.tz) {
                entry.next_fire = next;
            }
            running.insert(entry.spec.name.clone());
            due.push(Arc::clone(&entry.spec));
        }
        due
    }

    /// Earliest next-fire across all registered jobs.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.inner.jobs.lock().values().map(|e| e.next_fire).min()
    }
}

impl<C: Clock + Clone + 'static> Scheduler<C> {
    /// Start the tick loop.
    pub fn start(&self) {
        let mut handle = self.inner.loop_handle.lock();
        if handle.is_some() {
            return;
        }
        let scheduler = self.clone();
        *handle = Some(tokio::spawn(async move {
            info!("scheduler loop started");
            loop {
                if scheduler.inner.stopping.load(Ordering::SeqCst) {
                    break;
                }
                let now = scheduler.inner.clock.now_utc();
                for spec in scheduler.due_jobs(now) {
                    let inner = Arc::clone(&scheduler.inner);
                    tokio::spawn(async move {
                        Self::run_job(inner, spec).await;
                    });
                }

                let sleep = scheduler
                    .next_deadline()
                    .and_then(|deadline| {
                        (deadline - scheduler.inner.clock.now_utc()).to_std().ok()
                    })
                    .map(|until| until.min(scheduler.inner.config.tick))
                    .unwrap_or(scheduler.inner.config.tick);
                tokio::select! {
                    _ = scheduler.inner.shutdown.notified() => break,
                    _ = tokio::time::sleep(sleep) => {}
                }
            }
            info!("scheduler loop stopped");
        }));
    }

    /// Stop scheduling, wait for in-flight runs, close.
    pub async fn stop(&self) {
        self.inner.stopping.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        let handle = self.inner.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        // Drain the limiter to wait out in-flight runs
        let slots = self.inner.config.max_concurrent.max(1) as u32;
        if let Ok(permits) = self.inner.limiter.acquire_many(slots).await {
            drop(permits);
        }
    }

    async fn run_job(inner: Arc<Inner<C>>, spec: Arc<JobSpec>) {
        let Ok(_permit) = Arc::clone(&inner.limiter).acquire_owned().await else {
            inner.running.lock().remove(&spec.name);
            return;
        };

        {
            let hooks = inner.hooks.lock();
            if let Some(on_start) = &hooks.on_start {
                on_start(&spec.name);
            }
        }

        let started_at = inner.clock.now_utc();
        let started = inner.clock.now();
        debug!(job = %spec.name, "job started");

        let outcome = match tokio::time::timeout(
            spec.timeout,
            AssertUnwindSafe(spec.handler.run()).catch_unwind(),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(job = %spec.name, panic = %detail, "job panicked");
                Err(DomainError::Fatal(detail))
            }
            Err(_) => Err(DomainError::Timeout(spec.timeout)),
        };

        let finished_at = inner.clock.now_utc();
        let run = JobRun {
            name: spec.name.clone(),
            started_at,
            finished_at,
            duration: inner.clock.now() - started,
            success: outcome.is_ok(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        };

        if let Err(err) = &outcome {
            warn!(job = %spec.name, error = %err, "job failed");
            let hooks = inner.hooks.lock();
            if let Some(on_error) = &hooks.on_error {
                on_error(&spec.name, err);
            }
        }
        {
            let hooks = inner.hooks.lock();
            if let Some(on_complete) = &hooks.on_complete {
                on_complete(&run);
            }
        }
        {
            let mut history = inner.history.lock();
            if history.len() >= inner.config.history_limit.max(1) {
                history.pop_front();
            }
            history.push_back(run);
        }
        inner.running.lock().remove(&spec.name);
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
