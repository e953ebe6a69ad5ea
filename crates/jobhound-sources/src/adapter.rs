//! Source adapter capability.

use async_trait::async_trait;

use jobhound_core::{AppResult, Keyword};
use jobhound_entity::posting::RawPosting;

/// A job board queried once per keyword per scan pass.
///
/// Errors are local to one call; the orchestrator logs them and treats
/// the result as empty.
#[async_trait]
pub trait SourceAdapter: Send + Sync + 'static {
    /// Stable source name, stored on postings.
    fn name(&self) -> &str;

    /// Fetch postings matching `keyword`, in the source's own order.
    async fn fetch(&self, keyword: &Keyword) -> AppResult<Vec<RawPosting>>;
}
