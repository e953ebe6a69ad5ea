//! Ingestion and link-keyed deduplication.

use std::sync::Arc;

use tracing::{debug, warn};

use jobhound_core::Keyword;
use jobhound_database::store::PostingStore;
use jobhound_entity::posting::{NewPosting, Posting, RawPosting};

/// A posting accepted by one ingestion call.
#[derive(Debug, Clone)]
pub struct IngestedPosting {
    /// The stored row (first sighting wins).
    pub posting: Posting,
    /// Whether this call inserted it.
    pub created: bool,
}

/// Result of one `ingest` call.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// New and already-known postings, in input order.
    pub accepted: Vec<IngestedPosting>,
    /// Items dropped for missing link or title.
    pub invalid: usize,
    /// Items skipped because persistence failed.
    pub failed: usize,
}

impl IngestReport {
    /// Number of postings this call inserted.
    pub fn created_count(&self) -> usize {
        self.accepted.iter().filter(|p| p.created).count()
    }

    /// The accepted postings.
    pub fn postings(&self) -> impl Iterator<Item = &Posting> {
        self.accepted.iter().map(|p| &p.posting)
    }
}

/// Persists raw postings as canonical rows keyed by link.
#[derive(Clone)]
pub struct IngestionEngine {
    postings: Arc<dyn PostingStore>,
}

impl IngestionEngine {
    /// Create an engine over a posting store.
    pub fn new(postings: Arc<dyn PostingStore>) -> Self {
        Self { postings }
    }

    /// Upsert at most `cap` postings from one source for one keyword.
    ///
    /// The batch is truncated before anything is written. A failure on one
    /// posting is logged and that posting skipped; the rest still go through.
    pub async fn ingest(
        &self,
        source: &str,
        keyword: &Keyword,
        raw: &[RawPosting],
        cap: usize,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        for item in raw.iter().take(cap) {
            if !item.is_ingestible() {
                report.invalid += 1;
                continue;
            }

            let mut new_posting = NewPosting::from_raw(item, keyword);
            new_posting.source = source.to_string();

            match self.postings.upsert(&new_posting).await {
                Ok((posting, created)) => {
                    debug!(
                        posting_id = %posting.id,
                        link = %posting.link,
                        created,
                        "Posting ingested"
                    );
                    report.accepted.push(IngestedPosting { posting, created });
                }
                Err(e) => {
                    warn!(
                        source,
                        keyword = %keyword,
                        link = %new_posting.link,
                        error = %e,
                        "Failed to persist posting, skipping"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}
