//! Preference repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::{AppResult, Keyword};
use jobhound_entity::user::Preference;

use crate::store::PreferenceStore;

/// Repository for keyword subscriptions.
#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    pool: PgPool,
}

impl PreferenceRepository {
    /// Create a new preference repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PreferenceRepository {
    async fn add(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO preferences (user_id, keyword) VALUES ($1, $2) \
             ON CONFLICT (user_id, keyword) DO NOTHING",
        )
        .bind(user_id)
        .bind(keyword.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add preference", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Preference>> {
        sqlx::query_as::<_, Preference>(
            "SELECT * FROM preferences WHERE user_id = $1 ORDER BY created_at, keyword",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list preferences", e))
    }

    async fn holds(&self, user_id: Uuid, keyword: &Keyword) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM preferences WHERE user_id = $1 AND keyword = $2)",
        )
        .bind(user_id)
        .bind(keyword.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check preference", e))
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear preferences", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn distinct_keywords(&self) -> AppResult<Vec<Keyword>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT keyword FROM preferences ORDER BY keyword",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list keywords", e))?;
        Ok(rows.iter().filter_map(|k| Keyword::parse(k)).collect())
    }
}
