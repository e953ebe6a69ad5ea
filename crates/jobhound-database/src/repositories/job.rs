//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_core::error::{AppError, ErrorKind};
use jobhound_entity::job::{CreateJob, Job, job_types};

use crate::store::{JobStore, Reclaimed};

/// Repository for background job CRUD and queue operations.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (job_type, queue, priority, payload, max_attempts, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW())) RETURNING *",
        )
        .bind(&data.job_type)
        .bind(&data.queue)
        .bind(data.priority)
        .bind(&data.payload)
        .bind(data.max_attempts)
        .bind(data.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn dequeue(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', started_at = NOW(), worker_id = $2, \
             attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM jobs \
                WHERE queue = $1 AND status = 'pending' AND scheduled_at <= NOW() \
                ORDER BY \
                    CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 WHEN 'low' THEN 2 END, \
                    created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to dequeue job", e))
    }

    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', result = $2, error_message = NULL, \
             completed_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = $2, completed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e)
        })?;
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        error_message: &str,
        run_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'pending', error_message = $2, scheduled_at = $3, \
             started_at = NULL, worker_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(error_message)
        .bind(run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reschedule job", e))?;
        Ok(())
    }

    async fn has_active(&self, job_type: &str, stale_before: DateTime<Utc>) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM jobs WHERE job_type = $1 \
             AND (status = 'pending' OR (status = 'running' AND started_at >= $2)))",
        )
        .bind(job_type)
        .bind(stale_before)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check active jobs", e))
    }

    async fn reclaim_stale(&self, queue: &str, stale_before: DateTime<Utc>) -> AppResult<Reclaimed> {
        let db_err =
            |e: sqlx::Error| AppError::with_source(ErrorKind::Database, "Failed to reclaim stale jobs", e);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The row lock keeps a second reaper from touching the same rows.
        let requeued = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'pending', scheduled_at = NOW(), \
             error_message = 'Abandoned by worker ' || COALESCE(worker_id, 'unknown'), \
             started_at = NULL, worker_id = NULL, updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM jobs WHERE queue = $1 AND status = 'running' \
                AND started_at < $2 AND attempts < max_attempts \
                FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(stale_before)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        let failed = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'failed', \
             error_message = 'Abandoned by worker ' || COALESCE(worker_id, 'unknown'), \
             completed_at = NOW(), updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM jobs WHERE queue = $1 AND status = 'running' \
                AND started_at < $2 AND attempts >= max_attempts \
                FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .bind(queue)
        .bind(stale_before)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Reclaimed { requeued, failed })
    }

    async fn cancel_deliveries_for(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', completed_at = NOW(), updated_at = NOW() \
             WHERE job_type = $1 AND status = 'pending' \
             AND (payload->>'triggering_user_id' = $2 OR payload->>'recipient_id' = $2)",
        )
        .bind(job_types::DELIVER_POSTING)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to cancel delivery jobs", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn list_by_queue(&self, queue: &str) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE queue = $1 ORDER BY created_at")
            .bind(queue)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))
    }

    async fn cleanup_finished(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('completed', 'failed', 'cancelled') \
             AND updated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cleanup jobs", e))?;
        Ok(result.rows_affected())
    }
}
