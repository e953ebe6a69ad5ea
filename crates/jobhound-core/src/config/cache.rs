//! Where short-lived coordination keys live: the scan lock, idle-notice
//! windows and manual-scan guards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backing store for coordination keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local. Locks only hold within one process.
    #[default]
    Memory,
    /// Shared across every process pointed at the same Redis.
    Redis,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub provider: CacheBackend,
    #[serde(default)]
    pub redis: RedisCacheConfig,
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prepended to every key so several deployments can share one Redis.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Upper bound on live keys; one per user at most, plus a few globals.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".into()
}

fn default_key_prefix() -> String {
    "jobhound:".into()
}

fn default_max_capacity() -> u64 {
    10_000
}
