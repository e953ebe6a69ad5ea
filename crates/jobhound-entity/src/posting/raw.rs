//! Source-neutral shape produced by every adapter.

use serde::{Deserialize, Serialize};

/// A posting as fetched from an external source, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosting {
    /// Posting title.
    pub title: String,
    /// Canonical URL; the posting's identity.
    pub link: String,
    /// Hiring company, when the source exposes it.
    pub company: Option<String>,
    /// Plain-text or HTML description.
    pub description: Option<String>,
    /// Name of the adapter that produced it.
    pub source: String,
}

impl RawPosting {
    /// Whether the posting carries enough data to be ingested.
    pub fn is_ingestible(&self) -> bool {
        !self.link.trim().is_empty() && !self.title.trim().is_empty()
    }
}
