//! # jobhound-database
//!
//! Persistence for JobHound: the store traits the pipeline is written
//! against, PostgreSQL repositories implementing them, and an in-memory
//! store with the same uniqueness guarantees.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;
pub mod stores;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{
    DeliveryClaim, DeliveryLedger, JobStore, PostingStore, PreferenceStore, Reclaimed, UserStore,
};
pub use stores::Stores;
