//! Expiring string keys used to coordinate scans across tasks and processes.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::cache::CacheBackend;
use crate::result::AppResult;

/// Key-value store with per-key expiry.
///
/// Callers pass unprefixed keys from `jobhound_cache::keys`; a backend may
/// namespace them. Expired keys behave as if they were never written.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Overwrites any existing value and restarts its expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Write only if absent. `true` means this caller now holds the key.
    ///
    /// The scan lock, idle-notice windows and manual-scan guards all rely
    /// on this being atomic against concurrent callers of the same backend.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete `key` only while it still holds `value`, atomically. Releases a
    /// lock without touching one that expired and was taken by someone else.
    /// Returns whether the key was deleted.
    async fn delete_if_eq(&self, key: &str, value: &str) -> AppResult<bool>;

    async fn health_check(&self) -> AppResult<bool>;

    fn backend(&self) -> CacheBackend;
}
