//! External posting source configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every source adapter plus per-source toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// HTTP timeout applied to each fetch.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// User-Agent header sent to source sites.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// RemoteOK per-keyword RSS feed.
    #[serde(default = "SourceEndpoint::remoteok")]
    pub remoteok: SourceEndpoint,
    /// WeWorkRemotely global RSS feed, filtered locally by keyword.
    #[serde(default = "SourceEndpoint::weworkremotely")]
    pub weworkremotely: SourceEndpoint,
    /// Remotive JSON search API.
    #[serde(default = "SourceEndpoint::remotive")]
    pub remotive: SourceEndpoint,
}

impl SourcesConfig {
    /// Names of the enabled sources, in scan order.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.remoteok.enabled {
            names.push("remoteok");
        }
        if self.weworkremotely.enabled {
            names.push("weworkremotely");
        }
        if self.remotive.enabled {
            names.push("remotive");
        }
        names
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            remoteok: SourceEndpoint::remoteok(),
            weworkremotely: SourceEndpoint::weworkremotely(),
            remotive: SourceEndpoint::remotive(),
        }
    }
}

/// One source toggle and its base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEndpoint {
    /// Whether the source is queried during scans.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL; `{keyword}` is substituted where the source needs it.
    pub url: String,
}

impl SourceEndpoint {
    fn remoteok() -> Self {
        Self {
            enabled: true,
            url: "https://remoteok.com/remote-{keyword}-jobs.rss".to_string(),
        }
    }

    fn weworkremotely() -> Self {
        Self {
            enabled: true,
            url: "https://weworkremotely.com/remote-jobs.rss".to_string(),
        }
    }

    fn remotive() -> Self {
        Self {
            enabled: true,
            url: "https://remotive.com/api/remote-jobs".to_string(),
        }
    }
}

fn default_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    format!("jobhound/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}
