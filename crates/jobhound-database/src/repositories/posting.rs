//! Posting repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_core::error::{AppError, ErrorKind};
use jobhound_entity::posting::{NewPosting, Posting};

use crate::store::PostingStore;

/// Repository for postings, unique on `link`.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    pool: PgPool,
}

impl PostingRepository {
    /// Create a new posting repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostingStore for PostingRepository {
    async fn upsert(&self, posting: &NewPosting) -> AppResult<(Posting, bool)> {
        let inserted = sqlx::query_as::<_, Posting>(
            "INSERT INTO postings (link, title, company, description, source, keyword) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (link) DO NOTHING RETURNING *",
        )
        .bind(&posting.link)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.description)
        .bind(&posting.source)
        .bind(&posting.keyword)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert posting", e))?;

        if let Some(row) = inserted {
            return Ok((row, true));
        }

        // Lost the race or seen before; the committed row is authoritative.
        let existing = self.find_by_link(&posting.link).await?.ok_or_else(|| {
            AppError::conflict(format!("Posting {} vanished during upsert", posting.link))
        })?;
        Ok((existing, false))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Posting>> {
        sqlx::query_as::<_, Posting>("SELECT * FROM postings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find posting", e))
    }

    async fn find_by_link(&self, link: &str) -> AppResult<Option<Posting>> {
        sqlx::query_as::<_, Posting>("SELECT * FROM postings WHERE link = $1")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find posting by link", e)
            })
    }

    async fn count_by_link(&self, link: &str) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postings WHERE link = $1")
            .bind(link)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count postings", e))?;
        Ok(count as u64)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM postings WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete old postings", e)
            })?;
        Ok(result.rows_affected())
    }
}
