//! Remotive: JSON search API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::{AppResult, Keyword};
use jobhound_entity::posting::RawPosting;

use crate::adapter::SourceAdapter;
use crate::http::get_text;
use crate::rss::strip_html;

/// Source name stored on postings.
pub const NAME: &str = "Remotive";

const RESULT_LIMIT: &str = "20";
const DESCRIPTION_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs: Vec<RemotiveJob>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    title: Option<String>,
    url: Option<String>,
    company_name: Option<String>,
    description: Option<String>,
}

/// Adapter for `remote-jobs?search={keyword}`.
#[derive(Debug, Clone)]
pub struct RemotiveSource {
    client: Client,
    base_url: String,
}

impl RemotiveSource {
    /// Create an adapter against the API at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self, keyword: &Keyword) -> AppResult<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[("search", keyword.as_str()), ("limit", RESULT_LIMIT)],
        )
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid URL for {NAME}: {}", self.base_url),
                e,
            )
        })
    }
}

/// Decode a search response body into raw postings.
pub fn parse_response(body: &str) -> AppResult<Vec<RawPosting>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .jobs
        .into_iter()
        .filter_map(|job| {
            let description = job
                .description
                .map(|d| strip_html(&d).chars().take(DESCRIPTION_LIMIT).collect::<String>())
                .filter(|d| !d.is_empty());
            Some(RawPosting {
                title: job.title?,
                link: job.url?,
                company: job.company_name,
                description,
                source: NAME.to_string(),
            })
        })
        .filter(RawPosting::is_ingestible)
        .collect())
}

#[async_trait]
impl SourceAdapter for RemotiveSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, keyword: &Keyword) -> AppResult<Vec<RawPosting>> {
        let url = self.search_url(keyword)?;
        let body = get_text(&self.client, NAME, url).await?;
        parse_response(&body)
    }
}
