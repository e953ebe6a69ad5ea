//! RemoteOK: one RSS feed per keyword.

use async_trait::async_trait;
use reqwest::Client;

use jobhound_core::{AppResult, Keyword};
use jobhound_entity::posting::RawPosting;

use crate::adapter::SourceAdapter;
use crate::http::{get_text, parse_url};
use crate::rss::{FeedItem, parse_feed};

/// Source name stored on postings.
pub const NAME: &str = "RemoteOK";

/// Adapter for `remote-{keyword}-jobs.rss`.
#[derive(Debug, Clone)]
pub struct RemoteOkSource {
    client: Client,
    url_template: String,
}

impl RemoteOkSource {
    /// `url_template` must contain `{keyword}`.
    pub fn new(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    fn feed_url(&self, keyword: &Keyword) -> String {
        let slug = keyword.as_str().replace(' ', "-");
        self.url_template.replace("{keyword}", &slug)
    }
}

/// Map feed items to raw postings, dropping items without a link or title.
pub fn to_raw(items: Vec<FeedItem>) -> Vec<RawPosting> {
    items
        .into_iter()
        .filter_map(|item| {
            let company = item.company_name().or_else(|| Some("Unknown".to_string()));
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
impl SourceAdapter for RemoteOkSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &Keyword) -> AppResult<Vec<RawPosting>> {
        let url = parse_url(NAME, &self.feed_url(keyword))?;
        let body = get_text(&self.client, NAME, url).await?;
        Ok(to_raw(parse_feed(&body)?))
    }
}
