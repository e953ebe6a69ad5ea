//! Process-local backend on moka. Single-process deployments and tests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use jobhound_core::config::cache::{CacheBackend, MemoryCacheConfig};
use jobhound_core::result::AppResult;
use jobhound_core::traits::cache::CacheProvider;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    ttl: Duration,
}

/// Each key lives for the TTL it was last written with.
struct WrittenTtl;

impl Expiry<String, Slot> for WrittenTtl {
    fn expire_after_create(&self, _key: &String, slot: &Slot, _at: Instant) -> Option<Duration> {
        Some(slot.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    slots: Cache<String, Slot>,
}

impl MemoryCacheProvider {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let slots = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(WrittenTtl)
            .build();
        Self { slots }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.slots.get(key).await.map(|s| s.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let slot = Slot {
            value: value.to_owned(),
            ttl,
        };
        self.slots.insert(key.to_owned(), slot).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.slots.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.slots.get(key).await.is_some())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        // moka serialises concurrent initialisers of one key; only one sees a fresh entry.
        let entry = self
            .slots
            .entry(key.to_owned())
            .or_insert_with(async {
                Slot {
                    value: value.to_owned(),
                    ttl,
                }
            })
            .await;
        Ok(entry.is_fresh())
    }

    async fn delete_if_eq(&self, key: &str, value: &str) -> AppResult<bool> {
        let outcome = self
            .slots
            .entry(key.to_owned())
            .and_compute_with(|current| {
                let held = current.is_some_and(|slot| slot.value().value == value);
                std::future::ready(if held { Op::Remove } else { Op::Nop })
            })
            .await;
        Ok(matches!(outcome, CompResult::Removed(_)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    fn backend(&self) -> CacheBackend {
        CacheBackend::Memory
    }
}
