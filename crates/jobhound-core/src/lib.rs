//! # jobhound-core
//!
//! Core crate for JobHound. Contains configuration schemas, the unified
//! error system, the normalized keyword type, and the boundary traits
//! (cache, messaging transport) implemented by other crates.
//!
//! This crate has **no** internal dependencies on other JobHound crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use types::keyword::Keyword;
