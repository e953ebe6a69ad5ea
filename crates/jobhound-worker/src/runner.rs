//! Worker runner: polls one queue and executes its jobs with bounded
//! concurrency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;

use jobhound_core::AppResult;
use jobhound_core::config::worker::WorkerConfig;
use jobhound_core::traits::transport::MessageTransport;
use jobhound_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// Sends a chat message to an operator when a job is given up on.
#[derive(Clone)]
pub struct OperatorAlert {
    transport: Arc<dyn MessageTransport>,
    chat_id: String,
}

impl OperatorAlert {
    /// Alert `chat_id` through `transport`.
    pub fn new(transport: Arc<dyn MessageTransport>, chat_id: impl Into<String>) -> Self {
        Self {
            transport,
            chat_id: chat_id.into(),
        }
    }

    async fn job_failed(&self, job: &Job, error: &str) {
        let text = format!(
            "⚠️ Job {} ({}) failed after {} attempt(s): {}",
            job.id, job.job_type, job.attempts, error
        );
        if let Err(e) = self.transport.send(&self.chat_id, &text).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to alert operator");
        }
    }
}

/// Polls a single queue and runs up to `concurrency` jobs at once.
#[derive(Clone)]
pub struct WorkerRunner {
    queue: JobQueue,
    executor: Arc<JobExecutor>,
    queue_name: String,
    concurrency: usize,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    reclaim_interval: Duration,
    worker_id: String,
    alert: Option<OperatorAlert>,
}

impl std::fmt::Debug for WorkerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("queue", &self.queue_name)
            .field("concurrency", &self.concurrency)
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

impl WorkerRunner {
    /// Create a runner for `queue_name`.
    pub fn new(
        queue: JobQueue,
        executor: Arc<JobExecutor>,
        queue_name: impl Into<String>,
        concurrency: usize,
        config: &WorkerConfig,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            executor,
            queue_name: queue_name.into(),
            concurrency: concurrency.max(1),
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_seconds),
            reclaim_interval: Duration::from_secs(config.reclaim_interval_seconds.max(1)),
            worker_id: worker_id.into(),
            alert: None,
        }
    }

    /// Alert an operator when jobs exhaust their attempts.
    pub fn with_alert(mut self, alert: Option<OperatorAlert>) -> Self {
        self.alert = alert;
        self
    }

    /// Run until the cancel signal is received, then wait for in-flight jobs.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.worker_id,
            queue = %self.queue_name,
            concurrency = self.concurrency,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        // The first tick fires at once, so orphans from a previous run are
        // recovered before anything new is claimed.
        let mut last_reclaim: Option<time::Instant> = None;

        loop {
            if last_reclaim.is_none_or(|at| at.elapsed() >= self.reclaim_interval) {
                if let Err(e) = self.reclaim().await {
                    tracing::error!(queue = %self.queue_name, error = %e, "Failed to reclaim stale jobs");
                }
                last_reclaim = Some(time::Instant::now());
            }

            let permit = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.queue.dequeue(&self.queue_name, &self.worker_id).await {
                Ok(Some(job)) => {
                    let runner = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        runner.process(job).await;
                    });
                    continue;
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    tracing::error!(queue = %self.queue_name, error = %e, "Failed to dequeue job");
                }
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(queue = %self.queue_name, "Worker waiting for in-flight jobs");
        let permits = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        if time::timeout(self.shutdown_timeout, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            tracing::warn!(queue = %self.queue_name, "Shutdown timed out with jobs still running");
        }
        tracing::info!(queue = %self.queue_name, "Worker shut down");
    }

    /// Return orphaned jobs on this queue to pending; alert on those that
    /// were on their last attempt. Returns how many jobs were recovered.
    pub async fn reclaim(&self) -> AppResult<usize> {
        let reclaimed = self.queue.reclaim_stale(&self.queue_name).await?;
        if let Some(alert) = &self.alert {
            for job in &reclaimed.failed {
                let reason = job.error_message.as_deref().unwrap_or("abandoned");
                alert.job_failed(job, reason).await;
            }
        }
        Ok(reclaimed.requeued.len() + reclaimed.failed.len())
    }

    /// Claim and run one job inline. Returns whether a job was found.
    pub async fn run_next(&self) -> AppResult<bool> {
        match self.queue.dequeue(&self.queue_name, &self.worker_id).await? {
            Some(job) => {
                self.process(job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run jobs inline until the queue has nothing runnable. Returns how many
    /// were processed.
    pub async fn drain(&self) -> AppResult<usize> {
        let mut processed = 0;
        while self.run_next().await? {
            processed += 1;
        }
        Ok(processed)
    }

    async fn process(&self, job: Job) {
        let outcome = self.executor.execute(&job).await;
        if let Err(e) = self.settle(&job, outcome).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to record job outcome");
        }
    }

    async fn settle(
        &self,
        job: &Job,
        outcome: Result<Option<serde_json::Value>, JobExecutionError>,
    ) -> AppResult<()> {
        let err = match outcome {
            Ok(result) => {
                self.queue.complete(job.id, result.as_ref()).await?;
                tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job completed");
                return Ok(());
            }
            Err(err) => err,
        };

        let message = err.to_string();
        if err.is_retryable() && job.can_retry() {
            let run_at = self.queue.retry_later(job, &message).await?;
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts,
                max_attempts = job.max_attempts,
                retry_at = %run_at,
                error = %message,
                "Job failed, will retry"
            );
            return Ok(());
        }

        self.queue.fail(job.id, &message).await?;
        tracing::error!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempts = job.attempts,
            error = %message,
            "Job failed permanently"
        );
        if let Some(alert) = &self.alert {
            alert.job_failed(job, &message).await;
        }
        Ok(())
    }
}
