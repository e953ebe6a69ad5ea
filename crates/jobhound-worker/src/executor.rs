//! Job handlers and the table that routes jobs to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use jobhound_core::error::AppError;
use jobhound_entity::job::Job;

/// Runs one kind of job: scan, delivery or housekeeping.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// One of `job_types::*`.
    fn job_type(&self) -> &str;

    /// `Ok(Some(v))` is stored as the job's result.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// How a handler failed; decides between retry and giving up.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Bad payload or impossible request. Failed at once.
    #[error("permanent: {0}")]
    Permanent(String),

    /// Retried with backoff while attempts remain.
    #[error("transient: {0}")]
    Transient(String),

    /// Follows [`AppError::is_retryable`].
    #[error("{0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Permanent(_) => false,
            Self::Transient(_) => true,
            Self::Internal(err) => err.is_retryable(),
        }
    }
}

/// Routes each claimed job to the handler for its `job_type`.
#[derive(Default)]
pub struct JobExecutor {
    by_type: BTreeMap<String, Arc<dyn JobHandler>>,
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.registered_types()).finish()
    }
}

impl JobExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A later handler for the same type replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.job_type().to_owned();
        tracing::info!(job_type = %kind, "Job handler registered");
        self.by_type.insert(kind, handler);
    }

    /// An unknown type can never succeed, so it fails permanently on first sight.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let Some(handler) = self.by_type.get(job.job_type.as_str()) else {
            return Err(JobExecutionError::Permanent(format!(
                "nothing handles job type {:?}",
                job.job_type
            )));
        };

        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Running job"
        );
        handler.execute(job).await
    }

    /// Types with a handler, in name order.
    pub fn registered_types(&self) -> Vec<&str> {
        self.by_type.keys().map(String::as_str).collect()
    }
}
