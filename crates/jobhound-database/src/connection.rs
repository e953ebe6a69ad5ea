//! PostgreSQL pool: connect, migrate, hand out stores.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use jobhound_core::AppResult;
use jobhound_core::config::database::DatabaseConfig;
use jobhound_core::error::{AppError, ErrorKind};

use crate::migration::run_migrations;
use crate::stores::Stores;

/// Shared PostgreSQL pool behind every repository.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect, apply pending migrations, and confirm the server answers.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        let db = Self::connect(config).await?;
        run_migrations(&db.pool).await?;
        if !db.ping().await? {
            return Err(AppError::database("Database did not answer after migrations"));
        }
        Ok(db)
    }

    /// Connect without touching the schema.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        info!(
            url = %config.redacted_url(),
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Cannot reach {}", config.redacted_url()),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Repositories over this pool.
    pub fn stores(&self) -> Stores {
        Stores::postgres(self.pool.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> AppResult<bool> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Ping failed", e))?;
        Ok(one == 1)
    }

    /// Wait for checked-out connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}
