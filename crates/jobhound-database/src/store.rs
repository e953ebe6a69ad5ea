//! Store traits the pipeline is written against.
//!
//! Each trait has a PostgreSQL implementation in [`crate::repositories`]
//! and an in-memory one in [`crate::memory`]. Both enforce the same
//! uniqueness rules: one posting per link, one delivery record per
//! `(posting, user)` pair, one preference per `(user, keyword)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jobhound_core::{AppResult, Keyword};
use jobhound_entity::delivery::DeliveryRecord;
use jobhound_entity::job::{CreateJob, Job};
use jobhound_entity::posting::{NewPosting, Posting};
use jobhound_entity::user::{Preference, User};

/// Recipient persistence.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by messaging-system id.
    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;

    /// Create the user if missing, otherwise mark it active again.
    async fn upsert_active(&self, external_id: &str) -> AppResult<User>;

    /// Set the `active` flag. Returns `false` if the user does not exist.
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<bool>;

    /// Active users holding a preference for `keyword`.
    async fn find_active_by_keyword(&self, keyword: &Keyword) -> AppResult<Vec<User>>;

    /// Active users with at least one preference.
    async fn find_active_with_preferences(&self) -> AppResult<Vec<User>>;
}

/// Keyword subscription persistence.
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// Add a keyword for a user. Returns `false` if it was already held.
    async fn add(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool>;

    /// All preferences of a user, oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Preference>>;

    /// Whether the user currently holds `keyword`.
    async fn holds(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool>;

    /// Remove every preference of a user. Returns the number removed.
    async fn clear(&self, user_id: Uuid) -> AppResult<u64>;

    /// Distinct keywords held by any preference, sorted.
    async fn distinct_keywords(&self) -> AppResult<Vec<Keyword>>;
}

/// Posting persistence keyed by link.
#[async_trait]
pub trait PostingStore: Send + Sync + 'static {
    /// Insert unless a posting with the same link exists. Returns the stored
    /// row and whether this call created it. The existing row is never
    /// modified.
    async fn upsert(&self, posting: &NewPosting) -> AppResult<(Posting, bool)>;

    /// Find a posting by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Posting>>;

    /// Find a posting by link.
    async fn find_by_link(&self, link: &str) -> AppResult<Option<Posting>>;

    /// Count postings sharing `link` (0 or 1 when uniqueness holds).
    async fn count_by_link(&self, link: &str) -> AppResult<u64>;

    /// Delete postings first seen before `cutoff`, cascading to deliveries.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// The durable record of `(posting, user)` pairs already notified.
#[async_trait]
pub trait DeliveryLedger: Send + Sync + 'static {
    /// Whether a committed record exists. Advisory only; use
    /// [`DeliveryLedger::claim`] to gate a send.
    async fn is_delivered(&self, posting_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Atomically reserve the pair. Returns `None` when a record exists or
    /// another claim on the same pair is in flight.
    async fn claim(&self, posting_id: Uuid, user_id: Uuid)
    -> AppResult<Option<Box<dyn DeliveryClaim>>>;

    /// Committed records for a posting.
    async fn list_for_posting(&self, posting_id: Uuid) -> AppResult<Vec<DeliveryRecord>>;
}

/// An in-flight reservation of one ledger row.
///
/// Dropping a claim without committing releases it.
#[async_trait]
pub trait DeliveryClaim: Send {
    /// The reserved pair.
    fn pair(&self) -> (Uuid, Uuid);

    /// Make the record durable.
    async fn commit(self: Box<Self>) -> AppResult<DeliveryRecord>;

    /// Abandon the reservation so the pair can be claimed again.
    async fn release(self: Box<Self>) -> AppResult<()>;
}

/// Outcome of [`JobStore::reclaim_stale`].
#[derive(Debug, Clone, Default)]
pub struct Reclaimed {
    /// Back to pending, as they now stand.
    pub requeued: Vec<Job>,
    /// Abandoned on their last attempt and now failed.
    pub failed: Vec<Job>,
}

impl Reclaimed {
    pub fn is_empty(&self) -> bool {
        self.requeued.is_empty() && self.failed.is_empty()
    }
}

/// Message stored on a job recovered from a dead worker.
pub fn abandoned_message(worker_id: Option<&str>) -> String {
    format!("Abandoned by worker {}", worker_id.unwrap_or("unknown"))
}

/// Durable job queue persistence.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Insert a pending job.
    async fn create(&self, job: &CreateJob) -> AppResult<Job>;

    /// Find a job by id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Claim the most urgent runnable pending job on `queue`, marking it
    /// running and counting the attempt.
    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>>;

    /// Mark a job completed.
    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()>;

    /// Mark a job failed for good.
    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()>;

    /// Put a running job back to pending, runnable at `run_at`.
    async fn reschedule(&self, id: Uuid, error_message: &str, run_at: DateTime<Utc>)
    -> AppResult<()>;

    /// Whether a job of `job_type` is pending, or running with a claim
    /// taken at or after `stale_before`. Older running rows belong to a
    /// worker that died and do not count.
    async fn has_active(&self, job_type: &str, stale_before: DateTime<Utc>) -> AppResult<bool>;

    /// Recover jobs on `queue` still marked running with a claim older than
    /// `stale_before`. Rows with attempts left go back to pending and run
    /// immediately; the rest are failed.
    async fn reclaim_stale(&self, queue: &str, stale_before: DateTime<Utc>) -> AppResult<Reclaimed>;

    /// Cancel pending delivery jobs addressed to `user_id`.
    async fn cancel_deliveries_for(&self, user_id: Uuid) -> AppResult<u64>;

    /// Jobs on a queue, oldest first.
    async fn list_by_queue(&self, queue: &str) -> AppResult<Vec<Job>>;

    /// Delete terminal jobs last updated before `before`.
    async fn cleanup_finished(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
