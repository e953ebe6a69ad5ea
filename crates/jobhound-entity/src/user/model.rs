//! Subscribers, keyed by their chat id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A notification recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Stable per-recipient identifier in the messaging system (chat id).
    pub external_id: String,
    /// `false` once the user opted out or became unreachable.
    pub active: bool,
    /// First `/start` or `/set`.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Active from the first message.
    pub fn new(external_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
