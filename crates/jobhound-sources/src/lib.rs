//! # jobhound-sources
//!
//! Adapters that fetch raw postings for a keyword from external job
//! boards. Every adapter produces the same [`RawPosting`] shape behind
//! the [`SourceAdapter`] trait.
//!
//! [`RawPosting`]: jobhound_entity::posting::RawPosting

pub mod adapter;
pub mod http;
pub mod registry;
pub mod remoteok;
pub mod remotive;
pub mod rss;
pub mod weworkremotely;

pub use adapter::SourceAdapter;
pub use registry::build_sources;
