//! # jobhound-cache
//!
//! TTL key-value providers for JobHound. Two modes:
//!
//! - **memory**: in-process cache using [moka](https://crates.io/crates/moka)
//!   with per-entry expiry
//! - **redis**: Redis-backed cache, shared across processes and restarts
//!
//! The provider is selected at runtime from configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
