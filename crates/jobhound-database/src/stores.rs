//! Bundle of store handles shared by services and workers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::memory::MemoryStore;
use crate::repositories::{
    DeliveryRepository, JobRepository, PostingRepository, PreferenceRepository, UserRepository,
};
use crate::store::{DeliveryLedger, JobStore, PostingStore, PreferenceStore, UserStore};

/// One handle per store trait, backed by either PostgreSQL or memory.
#[derive(Clone)]
pub struct Stores {
    /// Recipients.
    pub users: Arc<dyn UserStore>,
    /// Keyword subscriptions.
    pub preferences: Arc<dyn PreferenceStore>,
    /// Postings keyed by link.
    pub postings: Arc<dyn PostingStore>,
    /// Delivery ledger.
    pub deliveries: Arc<dyn DeliveryLedger>,
    /// Job queue rows.
    pub jobs: Arc<dyn JobStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            preferences: Arc::new(PreferenceRepository::new(pool.clone())),
            postings: Arc::new(PostingRepository::new(pool.clone())),
            deliveries: Arc::new(DeliveryRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool)),
        }
    }

    /// Stores backed by one shared [`MemoryStore`].
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            preferences: Arc::new(store.clone()),
            postings: Arc::new(store.clone()),
            deliveries: Arc::new(store.clone()),
            jobs: Arc::new(store.clone()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
