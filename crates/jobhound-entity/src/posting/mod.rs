//! Posting entities.

pub mod model;
pub mod raw;

pub use model::{NewPosting, Posting};
pub use raw::RawPosting;
