//! In-process store implementing every store trait.
//!
//! All tables live behind one mutex, so each trait call is atomic with
//! respect to every other. Used by `database.url = "memory://"` and by
//! the test suites.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jobhound_core::{AppResult, Keyword};
use jobhound_entity::delivery::DeliveryRecord;
use jobhound_entity::job::{CreateJob, DeliveryTask, Job, JobStatus, job_types};
use jobhound_entity::posting::{NewPosting, Posting};
use jobhound_entity::user::{Preference, User};

use crate::store::{
    DeliveryClaim, DeliveryLedger, JobStore, PostingStore, PreferenceStore, Reclaimed, UserStore,
    abandoned_message,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    preferences: Vec<Preference>,
    postings: HashMap<Uuid, Posting>,
    links: HashMap<String, Uuid>,
    deliveries: HashMap<(Uuid, Uuid), DeliveryRecord>,
    claims: HashSet<(Uuid, Uuid)>,
    jobs: HashMap<Uuid, Job>,
}

impl Tables {
    fn holds(&self, user_id: Uuid, keyword: &str) -> bool {
        self.preferences
            .iter()
            .any(|p| p.user_id == user_id && p.keyword == keyword)
    }

    fn sorted_users<'a>(&self, users: impl Iterator<Item = &'a User>) -> Vec<User> {
        let mut out: Vec<User> = users.cloned().collect();
        out.sort_by_key(|u| (u.created_at, u.id));
        out
    }
}

/// Shared in-memory tables. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrite a posting's first-seen time. Lets callers stage aged data.
    pub fn backdate_posting(&self, posting_id: Uuid, created_at: DateTime<Utc>) -> bool {
        match self.lock().postings.get_mut(&posting_id) {
            Some(posting) => {
                posting.created_at = created_at;
                true
            }
            None => false,
        }
    }

    /// Move a job's claim time, as if its worker had stalled since `started_at`.
    pub fn backdate_job_start(&self, job_id: Uuid, started_at: DateTime<Utc>) -> bool {
        match self.lock().jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.started_at = Some(started_at);
                true
            }
            _ => false,
        }
    }

    /// Total number of committed delivery records.
    pub fn delivery_count(&self) -> usize {
        self.lock().deliveries.len()
    }

    /// Total number of postings.
    pub fn posting_count(&self) -> usize {
        self.lock().postings.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn upsert_active(&self, external_id: &str) -> AppResult<User> {
        let mut tables = self.lock();
        if let Some(user) = tables
            .users
            .values_mut()
            .find(|u| u.external_id == external_id)
        {
            user.active = true;
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }
        let user = User::new(external_id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<bool> {
        match self.lock().users.get_mut(&id) {
            Some(user) => {
                user.active = active;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_active_by_keyword(&self, keyword: &Keyword) -> AppResult<Vec<User>> {
        let tables = self.lock();
        let holders = tables
            .users
            .values()
            .filter(|u| u.active && tables.holds(u.id, keyword.as_str()));
        Ok(tables.sorted_users(holders))
    }

    async fn find_active_with_preferences(&self) -> AppResult<Vec<User>> {
        let tables = self.lock();
        let subscribed = tables
            .users
            .values()
            .filter(|u| u.active && tables.preferences.iter().any(|p| p.user_id == u.id));
        Ok(tables.sorted_users(subscribed))
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn add(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool> {
        let mut tables = self.lock();
        if tables.holds(user_id, keyword.as_str()) {
            return Ok(false);
        }
        tables.preferences.push(Preference::new(user_id, keyword));
        Ok(true)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Preference>> {
        Ok(self
            .lock()
            .preferences
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn holds(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool> {
        Ok(self.lock().holds(user_id, keyword.as_str()))
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<u64> {
        let mut tables = self.lock();
        let before = tables.preferences.len();
        tables.preferences.retain(|p| p.user_id != user_id);
        Ok((before - tables.preferences.len()) as u64)
    }

    async fn distinct_keywords(&self) -> AppResult<Vec<Keyword>> {
        let tables = self.lock();
        let set: BTreeSet<&str> = tables.preferences.iter().map(|p| p.keyword.as_str()).collect();
        Ok(set.into_iter().filter_map(Keyword::parse).collect())
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn upsert(&self, posting: &NewPosting) -> AppResult<(Posting, bool)> {
        let mut tables = self.lock();
        if let Some(existing) = tables
            .links
            .get(&posting.link)
            .and_then(|id| tables.postings.get(id))
        {
            return Ok((existing.clone(), false));
        }
        let row = posting.clone().into_posting(Utc::now());
        tables.links.insert(row.link.clone(), row.id);
        tables.postings.insert(row.id, row.clone());
        Ok((row, true))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Posting>> {
        Ok(self.lock().postings.get(&id).cloned())
    }

    async fn find_by_link(&self, link: &str) -> AppResult<Option<Posting>> {
        let tables = self.lock();
        Ok(tables
            .links
            .get(link)
            .and_then(|id| tables.postings.get(id))
            .cloned())
    }

    async fn count_by_link(&self, link: &str) -> AppResult<u64> {
        Ok(self
            .lock()
            .postings
            .values()
            .filter(|p| p.link == link)
            .count() as u64)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.lock();
        let expired: Vec<Uuid> = tables
            .postings
            .values()
            .filter(|p| p.created_at < cutoff)
            .map(|p| p.id)
            .collect();
        for id in &expired {
            if let Some(posting) = tables.postings.remove(id) {
                tables.links.remove(&posting.link);
            }
        }
        tables
            .deliveries
            .retain(|(posting_id, _), _| !expired.contains(posting_id));
        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl DeliveryLedger for MemoryStore {
    async fn is_delivered(&self, posting_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.lock().deliveries.contains_key(&(posting_id, user_id)))
    }

    async fn claim(
        &self,
        posting_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Box<dyn DeliveryClaim>>> {
        let key = (posting_id, user_id);
        let mut tables = self.lock();
        if tables.deliveries.contains_key(&key) || !tables.claims.insert(key) {
            return Ok(None);
        }
        Ok(Some(Box::new(MemoryClaim {
            tables: Arc::clone(&self.tables),
            key,
            settled: false,
        })))
    }

    async fn list_for_posting(&self, posting_id: Uuid) -> AppResult<Vec<DeliveryRecord>> {
        let mut records: Vec<DeliveryRecord> = self
            .lock()
            .deliveries
            .values()
            .filter(|r| r.posting_id == posting_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.delivered_at);
        Ok(records)
    }
}

/// Reservation of one pair in [`MemoryStore`]; released on drop unless committed.
struct MemoryClaim {
    tables: Arc<Mutex<Tables>>,
    key: (Uuid, Uuid),
    settled: bool,
}

impl MemoryClaim {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DeliveryClaim for MemoryClaim {
    fn pair(&self) -> (Uuid, Uuid) {
        self.key
    }

    async fn commit(mut self: Box<Self>) -> AppResult<DeliveryRecord> {
        let record = DeliveryRecord {
            posting_id: self.key.0,
            user_id: self.key.1,
            delivered_at: Utc::now(),
        };
        {
            let mut tables = self.lock();
            tables.claims.remove(&self.key);
            tables.deliveries.insert(self.key, record.clone());
        }
        self.settled = true;
        Ok(record)
    }

    async fn release(mut self: Box<Self>) -> AppResult<()> {
        self.lock().claims.remove(&self.key);
        self.settled = true;
        Ok(())
    }
}

impl Drop for MemoryClaim {
    fn drop(&mut self) {
        if !self.settled {
            let key = self.key;
            self.lock().claims.remove(&key);
        }
    }
}

fn addresses(job: &Job, user_id: Uuid) -> bool {
    match job.payload_as::<DeliveryTask>() {
        Ok(task) => task.triggering_user_id == Some(user_id) || task.recipient_id == Some(user_id),
        Err(_) => false,
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: &CreateJob) -> AppResult<Job> {
        let row = job.clone().into_job(Utc::now());
        self.lock().jobs.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let mut tables = self.lock();
        let next = tables
            .jobs
            .values()
            .filter(|j| j.queue == queue && j.status == JobStatus::Pending && j.scheduled_at <= now)
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.id.cmp(&b.id))
            })
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(job) = tables.jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.worker_id = Some(worker_id.to_string());
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            let now = Utc::now();
            job.status = JobStatus::Completed;
            job.result = result.cloned();
            job.error_message = None;
            job.completed_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            let now = Utc::now();
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.completed_at = Some(now);
            job.updated_at = now;
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        error_message: &str,
        run_at: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Pending;
                job.error_message = Some(error_message.to_string());
                job.scheduled_at = run_at;
                job.started_at = None;
                job.worker_id = None;
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn has_active(&self, job_type: &str, stale_before: DateTime<Utc>) -> AppResult<bool> {
        Ok(self.lock().jobs.values().any(|j| {
            j.job_type == job_type
                && match j.status {
                    JobStatus::Pending => true,
                    JobStatus::Running => j.started_at.is_some_and(|at| at >= stale_before),
                    _ => false,
                }
        }))
    }

    async fn reclaim_stale(&self, queue: &str, stale_before: DateTime<Utc>) -> AppResult<Reclaimed> {
        let now = Utc::now();
        let mut reclaimed = Reclaimed::default();
        for job in self.lock().jobs.values_mut() {
            let stale = job.queue == queue
                && job.status == JobStatus::Running
                && job.started_at.is_none_or(|at| at < stale_before);
            if !stale {
                continue;
            }
            job.error_message = Some(abandoned_message(job.worker_id.as_deref()));
            job.updated_at = now;
            if job.can_retry() {
                job.status = JobStatus::Pending;
                job.scheduled_at = now;
                job.started_at = None;
                job.worker_id = None;
                reclaimed.requeued.push(job.clone());
            } else {
                job.status = JobStatus::Failed;
                job.completed_at = Some(now);
                reclaimed.failed.push(job.clone());
            }
        }
        Ok(reclaimed)
    }

    async fn cancel_deliveries_for(&self, user_id: Uuid) -> AppResult<u64> {
        let now = Utc::now();
        let mut cancelled = 0;
        for job in self.lock().jobs.values_mut() {
            if job.job_type == job_types::DELIVER_POSTING
                && job.status == JobStatus::Pending
                && addresses(job, user_id)
            {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(now);
                job.updated_at = now;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn list_by_queue(&self, queue: &str) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .lock()
            .jobs
            .values()
            .filter(|j| j.queue == queue)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.created_at, j.id));
        Ok(jobs)
    }

    async fn cleanup_finished(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.lock();
        let before_len = tables.jobs.len();
        tables
            .jobs
            .retain(|_, j| !(j.status.is_terminal() && j.updated_at < before));
        Ok((before_len - tables.jobs.len()) as u64)
    }
}
