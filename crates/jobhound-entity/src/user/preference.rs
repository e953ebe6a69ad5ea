//! Keyword subscription entity.

use chrono::{DateTime, Utc};
use jobhound_core::Keyword;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's subscription to one normalized keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Preference {
    /// Unique preference identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Lowercased, trimmed keyword.
    pub keyword: String,
    /// When the subscription was added.
    pub created_at: DateTime<Utc>,
}

impl Preference {
    /// Build a preference row for a normalized keyword.
    pub fn new(user_id: Uuid, keyword: &Keyword) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            keyword: keyword.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}
