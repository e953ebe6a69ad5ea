//! Picks the coordination-key backend named in `[cache]`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use jobhound_core::config::cache::{CacheBackend, CacheConfig};
use jobhound_core::result::AppResult;
use jobhound_core::traits::cache::CacheProvider;

/// Handle shared by the scanner, the command handler and the worker.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider {
            CacheBackend::Redis => Self::redis(config).await?,
            CacheBackend::Memory => Self::memory(config)?,
        };

        Ok(Self { inner })
    }

    #[cfg(feature = "redis-backend")]
    async fn redis(config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
        info!(prefix = %config.redis.key_prefix, "Using Redis for coordination keys");
        let provider = crate::redis::RedisCacheProvider::connect(&config.redis).await?;
        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "redis-backend"))]
    async fn redis(_config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
        Err(jobhound_core::error::AppError::configuration(
            "cache.provider = \"redis\" but jobhound-cache was built without redis-backend",
        ))
    }

    #[cfg(feature = "memory")]
    fn memory(config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
        info!(
            max_capacity = config.memory.max_capacity,
            "Using the in-process cache; locks do not span processes"
        );
        Ok(Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory)))
    }

    #[cfg(not(feature = "memory"))]
    fn memory(_config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
        Err(jobhound_core::error::AppError::configuration(
            "cache.provider = \"memory\" but jobhound-cache was built without memory",
        ))
    }

    /// Wrap a provider built elsewhere, e.g. in tests.
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self { inner: provider }
    }

    /// Shared handle to the inner provider.
    pub fn shared(&self) -> Arc<dyn CacheProvider> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn delete_if_eq(&self, key: &str, value: &str) -> AppResult<bool> {
        self.inner.delete_if_eq(key, value).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    fn backend(&self) -> CacheBackend {
        self.inner.backend()
    }
}
