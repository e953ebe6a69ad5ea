//! Persisted queue rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobPriority, JobStatus};

/// One queued unit of work: a scan pass, a single delivery, or housekeeping.
///
/// The payload is a serialised [`ScanTask`](super::ScanTask),
/// [`DeliveryTask`](super::DeliveryTask) or
/// [`HousekeepingTask`](super::HousekeepingTask) depending on `job_type`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub queue: String,
    pub priority: JobPriority,
    pub payload: serde_json::Value,
    /// Handler summary, e.g. `{"new_postings": 2, "enqueued": 4}`.
    pub result: Option<serde_json::Value>,
    /// Last failure; cleared on completion.
    pub error_message: Option<String>,
    pub status: JobStatus,
    /// Incremented when a worker claims the job.
    pub attempts: i32,
    pub max_attempts: i32,
    /// Not claimable before this instant; pushed forward on retry.
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Attempts remain after the one in flight.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// What the enqueuer decides; the store fills in the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub job_type: String,
    pub queue: String,
    pub priority: JobPriority,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
    /// `None` runs as soon as a worker is free.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateJob {
    /// A fresh pending row; used by the in-memory store.
    pub fn into_job(self, now: DateTime<Utc>) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: self.job_type,
            queue: self.queue,
            priority: self.priority,
            payload: self.payload,
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            scheduled_at: self.scheduled_at.unwrap_or(now),
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
