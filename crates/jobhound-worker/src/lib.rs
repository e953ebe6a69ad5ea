//! Background job processing and scheduled tasks for JobHound.
//!
//! This crate provides:
//! - A durable job queue over the store, which is also where planned
//!   deliveries land
//! - Per-queue worker runners with bounded concurrency
//! - A job executor that dispatches jobs to the correct handler
//! - A cron scheduler with idempotent, name-keyed registrations
//! - Handlers for delivery, scan passes, and housekeeping

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::JobQueue;
pub use runner::{OperatorAlert, WorkerRunner};
pub use scheduler::CronScheduler;
