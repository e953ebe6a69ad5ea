//! # jobhound-service
//!
//! The posting pipeline and its callers. Ingestion collapses raw postings
//! onto one row per link, the planner decides who should hear about each
//! posting, the delivery service sends through the messaging transport
//! behind the ledger claim, and the orchestrator drives all of it once per
//! scan pass. The command service is the chat-facing caller of the same
//! entry points.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod command;
pub mod delivery;
pub mod format;
pub mod ingest;
pub mod notice;
pub mod orchestrator;
pub mod planner;
pub mod queue;

pub use command::{CommandService, Intent, classify};
pub use delivery::{DeliveryOutcome, NotificationService};
pub use ingest::{IngestReport, IngestedPosting, IngestionEngine};
pub use notice::IdleNotifier;
pub use orchestrator::{ScanOptions, ScanOrchestrator, ScanReport};
pub use planner::{DeliveryPlanner, PlanContext};
pub use queue::DeliveryQueue;
