//! Retention housekeeping job handler.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use jobhound_database::store::{JobStore, PostingStore};
use jobhound_entity::job::{HousekeepingTask, Job, job_types};

use crate::executor::{JobExecutionError, JobHandler};

/// Deletes postings past retention (their deliveries go with them) and
/// finished jobs older than the same window.
#[derive(Clone)]
pub struct HousekeepingJobHandler {
    postings: Arc<dyn PostingStore>,
    jobs: Arc<dyn JobStore>,
    retention_days: i64,
}

impl HousekeepingJobHandler {
    /// Create a handler with the default retention.
    pub fn new(postings: Arc<dyn PostingStore>, jobs: Arc<dyn JobStore>, retention_days: i64) -> Self {
        Self {
            postings,
            jobs,
            retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for HousekeepingJobHandler {
    fn job_type(&self) -> &str {
        job_types::HOUSEKEEPING
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let task: HousekeepingTask = job.payload_as().map_err(|e| {
            JobExecutionError::Permanent(format!("Invalid housekeeping payload: {e}"))
        })?;

        let days = task.retention_days.unwrap_or(self.retention_days);
        if days <= 0 {
            return Err(JobExecutionError::Permanent(format!(
                "Retention must be positive, got {days} days"
            )));
        }
        let cutoff = Utc::now() - Duration::days(days);

        tracing::info!(retention_days = days, %cutoff, "Running housekeeping");

        let postings_removed = self
            .postings
            .delete_created_before(cutoff)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Posting cleanup failed: {e}")))?;
        let jobs_removed = self
            .jobs
            .cleanup_finished(cutoff)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Job cleanup failed: {e}")))?;

        tracing::info!(postings_removed, jobs_removed, "Housekeeping finished");

        Ok(Some(json!({
            "retention_days": days,
            "postings_removed": postings_removed,
            "jobs_removed": jobs_removed,
        })))
    }
}
