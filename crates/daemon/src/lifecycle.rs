// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: wiring, startup, graceful shutdown.

use crate::config::Config;
use crate::handlers::{register_notification_handlers, register_projection_handlers};
use crate::jobs::{
    cleanup_job, digest_job, inactivity_job, rebuild_job, sync_job, JobContext,
};
use hearth_bus::{
    BufferedBus, BufferedBusConfig, Dispatcher, DispatcherConfig, EventBus, InstanceBus,
    LocalBus, LocalBusConfig, LoggingMiddleware, MetricsMiddleware, RecoveryMiddleware,
};
use hearth_core::{DomainError, FlagStore};
use hearth_integrations::{
    BreakerConfig, ChatClient, ChatConfig, PlatformClient, PlatformConfig,
};
use hearth_leaderboard::{LeaderboardCache, LeaderboardView};
use hearth_presence::{PresenceConfig, PresenceTracker};
use hearth_scheduler::{Scheduler, SchedulerConfig, SchedulerHooks};
use hearth_storage::{
    Database, MigrationRunner, ProgressRepository, SnapshotRepository, StudentRepository,
};
use hearth_store::{MemoryStore, RedisStore, Store};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the daemon runs.
pub struct Services {
    pub config: Config,
    pub database: Database,
    pub store: Arc<dyn Store>,
    pub bus: Arc<InstanceBus>,
    pub buffered: Arc<BufferedBus>,
    pub dispatcher: Arc<Dispatcher>,
    pub view: Arc<LeaderboardView>,
    pub cache: Arc<LeaderboardCache>,
    pub presence: Arc<PresenceTracker>,
    pub scheduler: Scheduler,
    /// Flag store shared with the bot and HTTP collaborators.
    pub flags: Arc<FlagStore>,
}

/// Build and start every service. Configuration is validated before
/// anything else runs.
pub async fn start(config: Config) -> Result<Services, DomainError> {
    config.validate()?;

    // Persistence first: nothing else makes sense without it
    let database = Database::connect(&config.database).await?;
    let applied = MigrationRunner::new(database.pool()).run().await?;
    if applied > 0 {
        info!(applied, "migrations applied");
    }

    // Hot store: Redis when enabled, in-process memory otherwise
    let store: Arc<dyn Store> = if config.presence_store.enabled {
        Arc::new(
            RedisStore::connect(&config.presence_store.url)
                .await
                .map_err(|e| DomainError::Unavailable(e.to_string()))?,
        )
    } else {
        warn!("presence store disabled; using in-process store");
        Arc::new(MemoryStore::new())
    };
    store
        .ping()
        .await
        .map_err(|e| DomainError::Unavailable(e.to_string()))?;

    // Bus chain: local -> cross-instance -> buffered front for bulk publishers
    let local = Arc::new(LocalBus::new(LocalBusConfig::default()));
    let bus = InstanceBus::start(
        Arc::clone(&local),
        Arc::clone(&store),
        hearth_bus::instance::EVENTS_CHANNEL,
        None,
    )
    .await?;
    let buffered = BufferedBus::start(
        Arc::clone(&bus) as Arc<dyn EventBus>,
        BufferedBusConfig::default(),
    );

    // Dispatcher with the standard middleware stack
    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
    dispatcher.add_middleware(Arc::new(RecoveryMiddleware));
    dispatcher.add_middleware(Arc::new(LoggingMiddleware));
    dispatcher.add_middleware(Arc::new(MetricsMiddleware::new(dispatcher.metrics())));
    Dispatcher::attach(&dispatcher, bus.as_ref())?;

    // Projections
    let view = Arc::new(LeaderboardView::new());
    let cache = Arc::new(LeaderboardCache::new(Arc::clone(&store)));

    // Presence
    let presence = Arc::new(
        PresenceTracker::new(
            Arc::clone(&store),
            PresenceConfig {
                online_ttl: config.presence_store.online_ttl,
                away_ttl: config.presence_store.away_ttl,
            },
        )
        .with_bus(Arc::clone(&bus) as Arc<dyn EventBus>),
    );

    // Outbound clients
    let chat = Arc::new(ChatClient::new(ChatConfig {
        base_url: config.chat.base_url.clone(),
        token: config.chat.token.clone(),
        poll_timeout: config.chat.poll_timeout,
        per_second_limit: config.chat.per_second_limit,
    })?);
    let platform = Arc::new(
        PlatformClient::with_clock(
            PlatformConfig {
                base_url: config.platform.base_url.clone(),
                api_key: config.platform.api_key.clone(),
                request_timeout: config.platform.request_timeout,
                max_retries: config.platform.max_retries,
                initial_backoff: config.platform.initial_backoff,
                cache_ttl: config.platform.cache_ttl,
            },
            BreakerConfig::platform_api(),
            hearth_core::SystemClock,
        )?,
    );

    register_projection_handlers(&dispatcher, Arc::clone(&view), Arc::clone(&cache));
    register_notification_handlers(&dispatcher, Arc::clone(&chat));

    // Scheduler and jobs
    let scheduler = Scheduler::new(SchedulerConfig {
        max_concurrent: config.scheduler.max_concurrent,
        tz: config.timezone,
        ..SchedulerConfig::default()
    });
    scheduler.set_hooks(SchedulerHooks {
        on_start: Some(Box::new(|job| tracing::debug!(job, "job starting"))),
        on_complete: Some(Box::new(|run| {
            tracing::debug!(
                job = %run.name,
                success = run.success,
                duration_ms = run.duration.as_millis() as u64,
                "job finished"
            );
        })),
        on_error: None,
    });

    if config.scheduler.enabled {
        let ctx = JobContext {
            students: Arc::new(StudentRepository::new(database.pool().clone())),
            progress: Arc::new(ProgressRepository::new(database.pool().clone())),
            snapshots: Arc::new(SnapshotRepository::new(database.pool().clone())),
            platform: Arc::clone(&platform),
            chat: Arc::clone(&chat),
            bus: Arc::clone(&buffered) as Arc<dyn EventBus>,
            view: Arc::clone(&view),
            cache: Arc::clone(&cache),
            presence: Arc::clone(&presence),
            tz: config.timezone,
            cohorts: config.platform.cohorts.clone(),
            digest_chat_id: config.chat.digest_chat_id,
        };
        scheduler.register(sync_job(ctx.clone(), &config.scheduler))?;
        scheduler.register(rebuild_job(ctx.clone(), &config.scheduler))?;
        scheduler.register(inactivity_job(ctx.clone(), &config.scheduler))?;
        scheduler.register(cleanup_job(ctx.clone(), &config.scheduler))?;
        scheduler.register(digest_job(ctx, &config.scheduler)?)?;
        scheduler.start();
        info!(jobs = ?scheduler.job_names(), "scheduler started");
    } else {
        warn!("scheduler disabled by configuration");
    }

    Ok(Services {
        config,
        database,
        store,
        bus,
        buffered,
        dispatcher,
        view,
        cache,
        presence,
        scheduler,
        flags: Arc::new(FlagStore::new()),
    })
}

/// Stop everything in dependency order, bounded by the shutdown timebox.
pub async fn shutdown(services: Services) {
    let timebox = services.config.shutdown_timeout;
    let drain = async {
        services.scheduler.stop().await;
        if let Err(err) = services.buffered.close().await {
            warn!(error = %err, "buffered bus close failed");
        }
        if let Err(err) = services.bus.close().await {
            warn!(error = %err, "bus close failed");
        }
        services.database.close().await;
    };
    match tokio::time::timeout(timebox, drain).await {
        Ok(()) => info!("shutdown complete"),
        Err(_) => warn!(timebox_secs = timebox.as_secs(), "shutdown timed out; exiting anyway"),
    }
}
