//! Typed queue payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue names.
pub mod queues {
    /// Scan passes. Consumed with concurrency 1.
    pub const SCAN: &str = "scan";
    /// One message fan-out per job.
    pub const DELIVERY: &str = "delivery";
    /// Retention and other housekeeping.
    pub const MAINTENANCE: &str = "maintenance";
}

/// Job type identifiers.
pub mod job_types {
    /// [`super::DeliveryTask`].
    pub const DELIVER_POSTING: &str = "deliver_posting";
    /// [`super::ScanTask`].
    pub const SCAN_SOURCES: &str = "scan_sources";
    /// [`super::HousekeepingTask`].
    pub const HOUSEKEEPING: &str = "housekeeping";
}

/// Notify about one posting.
///
/// With `triggering_user_id` set, only that user is addressed. Otherwise
/// `recipient_id` names the single planned recipient, re-checked at send
/// time. With neither, every active holder of `keyword` is resolved when
/// the task runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTask {
    /// Posting to announce.
    pub posting_id: Uuid,
    /// Keyword the posting matched.
    pub keyword: String,
    /// Origin banner selector.
    #[serde(default)]
    pub is_manual_scan: bool,
    /// User who requested the manual scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggering_user_id: Option<Uuid>,
    /// Planned recipient for automatic fan-out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
}

/// Trigger one orchestration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    /// Restrict the pass to one source adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_hint: Option<String>,
}

/// Delete postings past retention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousekeepingTask {
    /// Override of the configured retention in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}
