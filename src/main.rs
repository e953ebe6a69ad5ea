//! JobHound: job posting alerts over Telegram.
//!
//! Main entry point that wires all crates together and starts the worker,
//! scheduler, and chat polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

use jobhound_cache::provider::CacheManager;
use jobhound_core::config::AppConfig;
use jobhound_core::config::logging::LogFormat;
use jobhound_core::error::AppError;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_core::traits::transport::MessageTransport;
use jobhound_database::{DatabasePool, MemoryStore, Stores};
use jobhound_entity::job::queues;
use jobhound_service::{
    CommandService, DeliveryPlanner, DeliveryQueue, IdleNotifier, IngestionEngine,
    NotificationService, ScanOrchestrator,
};
use jobhound_telegram::{TelegramBot, TelegramClient, TelegramTransport};
use jobhound_worker::jobs::{DeliveryJobHandler, HousekeepingJobHandler, ScanJobHandler};
use jobhound_worker::{CronScheduler, JobExecutor, JobQueue, OperatorAlert, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("JOBHOUND_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Starting JobHound v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "JobHound stopped with an error");
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(false)
                .init();
        }
        LogFormat::Pretty => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Open the configured store, running migrations for PostgreSQL.
async fn open_stores(config: &AppConfig) -> Result<(Stores, Option<DatabasePool>), AppError> {
    if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; nothing survives a restart");
        return Ok((Stores::memory(&MemoryStore::new()), None));
    }

    let pool = DatabasePool::open(&config.database).await?;
    Ok((pool.stores(), Some(pool)))
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    // ── Persistence and cache ────────────────────────────────────
    let (stores, pool) = open_stores(&config).await?;

    let cache = CacheManager::new(&config.cache).await?;
    if !cache.health_check().await? {
        return Err(AppError::cache("Cache health check failed"));
    }
    tracing::info!(backend = %cache.backend(), "Cache ready");
    let cache: Arc<dyn CacheProvider> = cache.shared();

    // ── External collaborators ───────────────────────────────────
    let sources = jobhound_sources::build_sources(&config.sources)?;
    if sources.is_empty() {
        tracing::warn!("No sources enabled; scans will find nothing");
    }

    let telegram = TelegramClient::from_config(&config.telegram)?;
    let transport: Arc<dyn MessageTransport> = Arc::new(TelegramTransport::new(
        telegram.clone(),
        config.telegram.parse_mode.clone(),
    ));

    // ── Pipeline ─────────────────────────────────────────────────
    let job_queue = JobQueue::new(Arc::clone(&stores.jobs), &config.worker).with_visibility_timeout(
        queues::SCAN,
        Duration::from_secs(config.scanner.scan_lock_ttl_seconds),
    );
    let delivery_queue: Arc<dyn DeliveryQueue> = Arc::new(job_queue.clone());

    let orchestrator = ScanOrchestrator::new(
        sources,
        Arc::clone(&stores.preferences),
        IngestionEngine::new(Arc::clone(&stores.postings)),
        DeliveryPlanner::new(Arc::clone(&stores.users), Arc::clone(&stores.deliveries)),
        Arc::clone(&delivery_queue),
    );

    let notifications = NotificationService::new(
        Arc::clone(&stores.postings),
        Arc::clone(&stores.users),
        Arc::clone(&stores.preferences),
        Arc::clone(&stores.deliveries),
        Arc::clone(&transport),
    );

    let idle = config.scanner.idle_notice_enabled.then(|| {
        IdleNotifier::new(
            Arc::clone(&stores.users),
            Arc::clone(&cache),
            Arc::clone(&transport),
            Duration::from_secs(config.scanner.idle_notice_window_hours * 3600),
        )
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    // ── Worker and scheduler ─────────────────────────────────────
    let scheduler = if config.worker.enabled {
        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(DeliveryJobHandler::new(notifications)));
        executor.register(Arc::new(ScanJobHandler::new(
            orchestrator.clone(),
            Arc::clone(&cache),
            idle,
            config.scanner.clone(),
            worker_id.clone(),
        )));
        executor.register(Arc::new(HousekeepingJobHandler::new(
            Arc::clone(&stores.postings),
            Arc::clone(&stores.jobs),
            config.housekeeping.retention_days,
        )));
        let executor = Arc::new(executor);

        let alert = config
            .telegram
            .admin_chat_id
            .as_ref()
            .map(|chat| OperatorAlert::new(Arc::clone(&transport), chat.clone()));

        if config.worker.scan_concurrency != 1 {
            tracing::warn!(
                configured = config.worker.scan_concurrency,
                "Automatic scans are serialized; using scan concurrency 1"
            );
        }

        let runners = [
            (queues::SCAN, 1),
            (queues::DELIVERY, config.worker.delivery_concurrency),
            (queues::MAINTENANCE, 1),
        ];
        for (queue_name, concurrency) in runners {
            let runner = WorkerRunner::new(
                job_queue.clone(),
                Arc::clone(&executor),
                queue_name,
                concurrency,
                &config.worker,
                format!("{worker_id}-{queue_name}"),
            )
            .with_alert(alert.clone());
            let cancel = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { runner.run(cancel).await }));
        }

        let scheduler = CronScheduler::new().await?;
        scheduler
            .register_scan_tick(job_queue.clone(), &config.scanner.schedule)
            .await?;
        if config.housekeeping.enabled {
            scheduler
                .register_housekeeping(job_queue.clone(), &config.housekeeping.schedule)
                .await?;
        }
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Chat commands ────────────────────────────────────────────
    if config.telegram.polling_enabled {
        let commands = CommandService::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.preferences),
            orchestrator,
            delivery_queue,
            Arc::clone(&cache),
            Arc::clone(&transport),
            config.scanner.clone(),
        );
        let bot = TelegramBot::new(telegram, commands, config.telegram.poll_timeout_seconds)
            .with_drain_timeout(Duration::from_secs(config.worker.shutdown_timeout_seconds));
        let cancel = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { bot.run(cancel).await }));
    } else {
        tracing::info!("Telegram polling disabled");
    }

    tracing::info!("JobHound running");
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = &scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }

    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(config.worker.shutdown_timeout_seconds + 5);
    for task in tasks {
        if tokio::time::timeout(grace, task).await.is_err() {
            tracing::warn!("Background task did not stop in time");
        }
    }

    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("JobHound stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
