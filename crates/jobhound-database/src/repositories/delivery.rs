//! Delivery ledger repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_core::error::{AppError, ErrorKind};
use jobhound_entity::delivery::DeliveryRecord;

use crate::store::{DeliveryClaim, DeliveryLedger};

/// Ledger backed by the `deliveries` table (primary key `(posting_id, user_id)`).
#[derive(Debug, Clone)]
pub struct DeliveryRepository {
    pool: PgPool,
}

impl DeliveryRepository {
    /// Create a new delivery repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLedger for DeliveryRepository {
    async fn is_delivered(&self, posting_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM deliveries WHERE posting_id = $1 AND user_id = $2)",
        )
        .bind(posting_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check delivery", e))
    }

    async fn claim(
        &self,
        posting_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Box<dyn DeliveryClaim>>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin delivery claim", e)
        })?;

        // A concurrent uncommitted insert of the same key blocks here until
        // its transaction ends, so at most one claimer proceeds.
        let record = sqlx::query_as::<_, DeliveryRecord>(
            "INSERT INTO deliveries (posting_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (posting_id, user_id) DO NOTHING RETURNING *",
        )
        .bind(posting_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim delivery", e))?;

        match record {
            Some(record) => Ok(Some(Box::new(PgDeliveryClaim { tx, record }))),
            None => {
                tx.rollback().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to end delivery claim", e)
                })?;
                Ok(None)
            }
        }
    }

    async fn list_for_posting(&self, posting_id: Uuid) -> AppResult<Vec<DeliveryRecord>> {
        sqlx::query_as::<_, DeliveryRecord>(
            "SELECT * FROM deliveries WHERE posting_id = $1 ORDER BY delivered_at",
        )
        .bind(posting_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list deliveries", e))
    }
}

/// A ledger row inserted inside an open transaction.
struct PgDeliveryClaim {
    tx: Transaction<'static, Postgres>,
    record: DeliveryRecord,
}

#[async_trait]
impl DeliveryClaim for PgDeliveryClaim {
    fn pair(&self) -> (Uuid, Uuid) {
        (self.record.posting_id, self.record.user_id)
    }

    async fn commit(self: Box<Self>) -> AppResult<DeliveryRecord> {
        let Self { tx, record } = *self;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit delivery record", e)
        })?;
        Ok(record)
    }

    async fn release(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to release delivery claim", e)
        })
    }
}
