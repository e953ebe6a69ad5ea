//! Scan scheduling and per-pass limits.

use serde::{Deserialize, Serialize};

/// Limits and cadence for automatic and manual scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Cron expression (with seconds) for the automatic scan tick.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Per-source, per-keyword ingestion cap for automatic scans.
    #[serde(default = "default_scheduled_cap")]
    pub scheduled_max_jobs_per_site: usize,
    /// Per-source, per-keyword ingestion cap for manual scans.
    #[serde(default = "default_manual_cap")]
    pub manual_max_jobs_per_site: usize,
    /// Age window (days) for re-surfacing known postings on manual scans.
    #[serde(default = "default_manual_max_age")]
    pub manual_max_age_days: f64,
    /// TTL of the cross-process automatic scan lock.
    #[serde(default = "default_lock_ttl")]
    pub scan_lock_ttl_seconds: u64,
    /// Send a "nothing new" notice after empty automatic passes.
    #[serde(default = "default_true")]
    pub idle_notice_enabled: bool,
    /// Minimum hours between two idle notices to the same user.
    #[serde(default = "default_idle_window")]
    pub idle_notice_window_hours: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            scheduled_max_jobs_per_site: default_scheduled_cap(),
            manual_max_jobs_per_site: default_manual_cap(),
            manual_max_age_days: default_manual_max_age(),
            scan_lock_ttl_seconds: default_lock_ttl(),
            idle_notice_enabled: default_true(),
            idle_notice_window_hours: default_idle_window(),
        }
    }
}

fn default_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_scheduled_cap() -> usize {
    20
}

fn default_manual_cap() -> usize {
    10
}

fn default_manual_max_age() -> f64 {
    2.0
}

fn default_lock_ttl() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_idle_window() -> u64 {
    12
}
