//! Job queue for enqueuing and dequeuing background jobs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_core::config::worker::WorkerConfig;
use jobhound_database::store::{JobStore, Reclaimed};
use jobhound_entity::job::{
    CreateJob, DeliveryTask, HousekeepingTask, Job, JobPriority, ScanTask, job_types, queues,
};
use jobhound_service::DeliveryQueue;

/// Job queue backed by a [`JobStore`].
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    max_attempts: i32,
    retry_backoff: Duration,
    visibility_timeout: Duration,
    visibility_by_queue: HashMap<String, Duration>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("visibility_timeout", &self.visibility_timeout)
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Create a queue with the retry policy from `config`.
    pub fn new(store: Arc<dyn JobStore>, config: &WorkerConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::seconds(config.retry_backoff_seconds as i64),
            visibility_timeout: Duration::seconds(config.visibility_timeout_seconds as i64),
            visibility_by_queue: HashMap::new(),
        }
    }

    /// Give `queue` a visibility timeout of its own, never below the default.
    pub fn with_visibility_timeout(mut self, queue: &str, timeout: std::time::Duration) -> Self {
        let timeout = Duration::seconds(timeout.as_secs() as i64).max(self.visibility_timeout);
        self.visibility_by_queue.insert(queue.to_string(), timeout);
        self
    }

    /// How long a claim on `queue` may stay running before it counts as orphaned.
    pub fn visibility_timeout(&self, queue: &str) -> Duration {
        self.visibility_by_queue
            .get(queue)
            .copied()
            .unwrap_or(self.visibility_timeout)
    }

    fn stale_before(&self, queue: &str) -> DateTime<Utc> {
        Utc::now() - self.visibility_timeout(queue)
    }

    /// Enqueue a new job.
    pub async fn enqueue(&self, params: CreateJob) -> AppResult<Job> {
        let job = self.store.create(&params).await?;
        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            priority = ?job.priority,
            "Enqueued job"
        );
        Ok(job)
    }

    fn params<T: Serialize>(
        &self,
        job_type: &str,
        queue: &str,
        priority: JobPriority,
        payload: &T,
    ) -> AppResult<CreateJob> {
        Ok(CreateJob {
            job_type: job_type.to_string(),
            queue: queue.to_string(),
            priority,
            payload: serde_json::to_value(payload)?,
            max_attempts: self.max_attempts,
            scheduled_at: None,
        })
    }

    /// Enqueue a scan pass.
    pub async fn enqueue_scan(&self, task: &ScanTask) -> AppResult<Job> {
        let params = self.params(job_types::SCAN_SOURCES, queues::SCAN, JobPriority::Normal, task)?;
        self.enqueue(params).await
    }

    /// Enqueue a retention run.
    pub async fn enqueue_housekeeping(&self, task: &HousekeepingTask) -> AppResult<Job> {
        let mut params = self.params(
            job_types::HOUSEKEEPING,
            queues::MAINTENANCE,
            JobPriority::Low,
            task,
        )?;
        params.max_attempts = 1;
        self.enqueue(params).await
    }

    /// Whether a job of `job_type` on `queue` is pending or held by a live worker.
    pub async fn has_active(&self, queue: &str, job_type: &str) -> AppResult<bool> {
        self.store.has_active(job_type, self.stale_before(queue)).await
    }

    /// Recover jobs on `queue` whose worker stopped without settling them.
    pub async fn reclaim_stale(&self, queue: &str) -> AppResult<Reclaimed> {
        let reclaimed = self.store.reclaim_stale(queue, self.stale_before(queue)).await?;
        for job in &reclaimed.requeued {
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                "Recovered job from a dead worker"
            );
        }
        for job in &reclaimed.failed {
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                "Job abandoned on its last attempt"
            );
        }
        Ok(reclaimed)
    }

    /// Claim the next runnable job on `queue`.
    pub async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let job = self.store.dequeue(queue, worker_id).await?;
        if let Some(job) = &job {
            tracing::debug!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                "Dequeued job"
            );
        }
        Ok(job)
    }

    /// Mark a job as completed.
    pub async fn complete(&self, job_id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        self.store.complete(job_id, result).await
    }

    /// Mark a job as failed for good.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.store.fail(job_id, error).await
    }

    /// Put a job back with backoff. Returns when it becomes runnable again.
    pub async fn retry_later(&self, job: &Job, error: &str) -> AppResult<DateTime<Utc>> {
        let run_at = Utc::now() + self.backoff_for(job.attempts);
        self.store.reschedule(job.id, error, run_at).await?;
        Ok(run_at)
    }

    /// `base * attempt²`.
    pub fn backoff_for(&self, attempt: i32) -> Duration {
        let attempt = attempt.max(1);
        self.retry_backoff * (attempt * attempt)
    }

    /// Jobs currently on a queue.
    pub async fn list(&self, queue: &str) -> AppResult<Vec<Job>> {
        self.store.list_by_queue(queue).await
    }
}

#[async_trait]
impl DeliveryQueue for JobQueue {
    async fn enqueue_delivery(&self, task: DeliveryTask) -> AppResult<()> {
        let priority = JobPriority::for_delivery(task.is_manual_scan);
        let params = self.params(job_types::DELIVER_POSTING, queues::DELIVERY, priority, &task)?;
        self.enqueue(params).await?;
        Ok(())
    }

    async fn cancel_deliveries_for(&self, user_id: Uuid) -> AppResult<u64> {
        self.store.cancel_deliveries_for(user_id).await
    }
}
