//! Canonical posting entity.

use chrono::{DateTime, Duration, Utc};
use jobhound_core::Keyword;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::raw::RawPosting;

/// A posting persisted once per unique link.
///
/// `keyword`, `source` and `created_at` describe the first sighting and
/// are never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Posting {
    /// Unique posting identifier.
    pub id: Uuid,
    /// Unique link.
    pub link: String,
    /// Title.
    pub title: String,
    /// Company, if known.
    pub company: Option<String>,
    /// Description, if known.
    pub description: Option<String>,
    /// Source adapter of the first sighting.
    pub source: String,
    /// Keyword of the first sighting.
    pub keyword: String,
    /// First ingestion time.
    pub created_at: DateTime<Utc>,
}

impl Posting {
    /// Time elapsed since first ingestion, never negative.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Age in fractional days.
    pub fn age_in_days_at(&self, now: DateTime<Utc>) -> f64 {
        self.age_at(now).num_seconds() as f64 / 86_400.0
    }
}

/// Data required to insert a posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPosting {
    /// Unique link (trimmed).
    pub link: String,
    /// Title.
    pub title: String,
    /// Company.
    pub company: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Source adapter name.
    pub source: String,
    /// Keyword under which it was fetched.
    pub keyword: String,
}

impl NewPosting {
    /// Attach the fetching keyword to a raw posting.
    pub fn from_raw(raw: &RawPosting, keyword: &Keyword) -> Self {
        Self {
            link: raw.link.trim().to_string(),
            title: raw.title.trim().to_string(),
            company: raw.company.clone(),
            description: raw.description.clone(),
            source: raw.source.clone(),
            keyword: keyword.as_str().to_string(),
        }
    }

    /// Materialize as a posting row created at `now`.
    pub fn into_posting(self, now: DateTime<Utc>) -> Posting {
        Posting {
            id: Uuid::new_v4(),
            link: self.link,
            title: self.title,
            company: self.company,
            description: self.description,
            source: self.source,
            keyword: self.keyword,
            created_at: now,
        }
    }
}
