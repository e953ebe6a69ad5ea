//! # jobhound-entity
//!
//! Domain entity models for JobHound. Every struct in this crate
//! represents a database table row, a value object passed between
//! pipeline stages, or a queue payload. Database entities derive
//! `sqlx::FromRow`.

pub mod delivery;
pub mod job;
pub mod posting;
pub mod user;
