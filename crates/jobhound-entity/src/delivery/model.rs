//! Delivery record entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Proof that `user_id` was told about `posting_id`. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeliveryRecord {
    /// Delivered posting.
    pub posting_id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// When the send succeeded.
    pub delivered_at: DateTime<Utc>,
}
