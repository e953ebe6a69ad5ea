//! Shared value types.

pub mod keyword;
