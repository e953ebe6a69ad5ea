//! User repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::{AppResult, Keyword};
use jobhound_entity::user::User;

use crate::store::UserStore;

/// Repository for recipient rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by external id", e)
            })
    }

    async fn upsert_active(&self, external_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (external_id, active) VALUES ($1, TRUE) \
             ON CONFLICT (external_id) DO UPDATE SET active = TRUE, updated_at = NOW() \
             RETURNING *",
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert user", e))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE users SET active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update user status", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_active_by_keyword(&self, keyword: &Keyword) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN preferences p ON p.user_id = u.id \
             WHERE u.active = TRUE AND p.keyword = $1 \
             ORDER BY u.created_at",
        )
        .bind(keyword.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find keyword holders", e)
        })
    }

    async fn find_active_with_preferences(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             WHERE u.active = TRUE \
             AND EXISTS (SELECT 1 FROM preferences p WHERE p.user_id = u.id) \
             ORDER BY u.created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list subscribers", e))
    }
}
