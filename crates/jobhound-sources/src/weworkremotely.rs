//! WeWorkRemotely: one global feed, filtered locally by keyword.

use async_trait::async_trait;
use reqwest::Client;

use jobhound_core::{AppResult, Keyword};
use jobhound_entity::posting::RawPosting;

use crate::adapter::SourceAdapter;
use crate::http::{get_text, parse_url};
use crate::rss::{FeedItem, parse_feed};

/// Source name stored on postings.
pub const NAME: &str = "WeWorkRemotely";

/// Adapter for the global WeWorkRemotely feed.
#[derive(Debug, Clone)]
pub struct WeWorkRemotelySource {
    client: Client,
    url: String,
}

impl WeWorkRemotelySource {
    /// Create an adapter for the feed at `url`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Whether the keyword appears in the title, text, or any category.
pub fn matches_keyword(item: &FeedItem, keyword: &Keyword) -> bool {
    let needle = keyword.as_str();
    let contains = |s: &str| s.to_lowercase().contains(needle);
    item.title.as_deref().is_some_and(contains)
        || item.snippet().as_deref().is_some_and(contains)
        || item.categories.iter().any(|c| contains(c))
}

/// Keep matching items and map them to raw postings.
pub fn to_raw(items: Vec<FeedItem>, keyword: &Keyword) -> Vec<RawPosting> {
    items
        .into_iter()
        .filter(|item| matches_keyword(item, keyword))
        .filter_map(|item| {
            let company = item
                .company_name()
                .or_else(|| Some("Remote Company".to_string()));
            let description = item.snippet();
            Some(RawPosting {
                title: item.title?,
                link: item.link?,
                company,
                description,
                source: NAME.to_string(),
            })
        })
        .filter(RawPosting::is_ingestible)
        .collect()
}

#[async_trait]
impl SourceAdapter for WeWorkRemotelySource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &Keyword) -> AppResult<Vec<RawPosting>> {
        let url = parse_url(NAME, &self.url)?;
        let body = get_text(&self.client, NAME, url).await?;
        Ok(to_raw(parse_feed(&body)?, keyword))
    }
}
