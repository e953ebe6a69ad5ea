//! Cron scheduler for recurring scan and housekeeping ticks.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_core::error::AppError;
use jobhound_entity::job::{HousekeepingTask, ScanTask, job_types, queues};

use crate::queue::JobQueue;

/// Registration name of the automatic scan tick.
pub const SCAN_TICK: &str = "scan_tick";
/// Registration name of the retention tick.
pub const HOUSEKEEPING_TICK: &str = "housekeeping_tick";

struct Registration {
    cron: String,
    id: Uuid,
}

/// Cron-based scheduler whose registrations are keyed by a stable name.
///
/// Registering the same name with the same cadence again is a no-op; a new
/// cadence replaces the previous registration.
pub struct CronScheduler {
    scheduler: JobScheduler,
    registrations: Mutex<HashMap<String, Registration>>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish_non_exhaustive()
    }
}

impl CronScheduler {
    /// Create a new, stopped scheduler.
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self {
            scheduler,
            registrations: Mutex::new(HashMap::new()),
        })
    }

    /// Register `task` under `name` on `cron` (six fields, with seconds).
    ///
    /// Returns `false` when an identical registration already existed.
    pub async fn register<F, Fut>(&self, name: &str, cron: &str, task: F) -> AppResult<bool>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut registrations = self.registrations.lock().await;

        if let Some(existing) = registrations.get(name) {
            if existing.cron == cron {
                tracing::debug!(name, cron, "Schedule already registered");
                return Ok(false);
            }
            self.scheduler.remove(&existing.id).await.map_err(|e| {
                AppError::internal(format!("Failed to remove {name} schedule: {e}"))
            })?;
            tracing::info!(name, old = %existing.cron, new = cron, "Replacing schedule");
        }

        let job = CronJob::new_async(cron, move |_id, _lock| Box::pin(task()))
            .map_err(|e| AppError::configuration(format!("Invalid cron '{cron}' for {name}: {e}")))?;
        let id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        registrations.insert(
            name.to_string(),
            Registration {
                cron: cron.to_string(),
                id,
            },
        );
        tracing::info!(name, cron, "Registered schedule");
        Ok(true)
    }

    /// Registered `(name, cron)` pairs, sorted by name.
    pub async fn registered(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .registrations
            .lock()
            .await
            .iter()
            .map(|(name, r)| (name.clone(), r.cron.clone()))
            .collect();
        out.sort();
        out
    }

    /// Enqueue an automatic scan on `cron`.
    pub async fn register_scan_tick(&self, queue: JobQueue, cron: &str) -> AppResult<bool> {
        self.register(SCAN_TICK, cron, move || {
            let queue = queue.clone();
            async move {
                if let Err(e) = enqueue_scan_tick(&queue).await {
                    tracing::error!(error = %e, "Failed to enqueue scan");
                }
            }
        })
        .await
    }

    /// Enqueue retention housekeeping on `cron`.
    pub async fn register_housekeeping(&self, queue: JobQueue, cron: &str) -> AppResult<bool> {
        self.register(HOUSEKEEPING_TICK, cron, move || {
            let queue = queue.clone();
            async move {
                if let Err(e) = queue.enqueue_housekeeping(&HousekeepingTask::default()).await {
                    tracing::error!(error = %e, "Failed to enqueue housekeeping");
                }
            }
        })
        .await
    }

    /// Start firing registrations.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&self) -> AppResult<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;
        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Make one automatic scan runnable unless a live one is already queued or
/// running. A scan orphaned by a dead worker is recovered first, so a crash
/// mid-pass never blocks later ticks. Returns whether this tick left a newly
/// runnable scan behind, either enqueued or recovered.
pub async fn enqueue_scan_tick(queue: &JobQueue) -> AppResult<bool> {
    let reclaimed = queue.reclaim_stale(queues::SCAN).await?;
    if !reclaimed.requeued.is_empty() {
        return Ok(true);
    }
    if queue.has_active(queues::SCAN, job_types::SCAN_SOURCES).await? {
        tracing::debug!("Scan already queued or running, skipping tick");
        return Ok(false);
    }
    let job = queue.enqueue_scan(&ScanTask::default()).await?;
    tracing::debug!(job_id = %job.id, "Scan tick enqueued");
    Ok(true)
}
