//! Schema migrations embedded from `migrations/`.

use sqlx::PgPool;
use tracing::info;

use jobhound_core::AppResult;
use jobhound_core::error::{AppError, ErrorKind};

/// Apply every migration the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Schema migration failed", e)
    })?;
    info!(count = migrator.iter().count(), "Schema up to date");
    Ok(())
}
