//! Shared HTTP plumbing for adapters.

use std::time::Duration;

use reqwest::{Client, Url};

use jobhound_core::config::sources::SourcesConfig;
use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::AppResult;

/// Build the HTTP client shared by all adapters.
pub fn build_client(config: &SourcesConfig) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })
}

/// GET `url` and return the body, failing on non-2xx statuses.
pub async fn get_text(client: &Client, source: &str, url: Url) -> AppResult<String> {
    tracing::debug!(source, url = %url, "Fetching source");
    let response = client.get(url).send().await.map_err(|e| {
        AppError::with_source(ErrorKind::ExternalService, format!("{source} request failed"), e)
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::external(format!("{source} returned HTTP {status}")));
    }

    response.text().await.map_err(|e| {
        AppError::with_source(
            ErrorKind::ExternalService,
            format!("{source} body could not be read"),
            e,
        )
    })
}

/// Parse a configured URL.
pub fn parse_url(source: &str, raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid URL for {source}: {raw}"),
            e,
        )
    })
}
