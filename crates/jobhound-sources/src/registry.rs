//! Build the configured adapter set.

use std::sync::Arc;

use tracing::info;

use jobhound_core::AppResult;
use jobhound_core::config::sources::SourcesConfig;

use crate::adapter::SourceAdapter;
use crate::http::build_client;
use crate::remoteok::RemoteOkSource;
use crate::remotive::RemotiveSource;
use crate::weworkremotely::WeWorkRemotelySource;

/// Instantiate every enabled adapter, sharing one HTTP client.
pub fn build_sources(config: &SourcesConfig) -> AppResult<Vec<Arc<dyn SourceAdapter>>> {
    let client = build_client(config)?;
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if config.remoteok.enabled {
        sources.push(Arc::new(RemoteOkSource::new(
            client.clone(),
            config.remoteok.url.clone(),
        )));
    }
    if config.weworkremotely.enabled {
        sources.push(Arc::new(WeWorkRemotelySource::new(
            client.clone(),
            config.weworkremotely.url.clone(),
        )));
    }
    if config.remotive.enabled {
        sources.push(Arc::new(RemotiveSource::new(
            client,
            config.remotive.url.clone(),
        )));
    }

    info!(
        sources = ?sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
        "Source adapters ready"
    );
    Ok(sources)
}
