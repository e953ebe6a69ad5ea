//! Retention housekeeping configuration.

use serde::{Deserialize, Serialize};

/// Periodic deletion of old postings (and their delivery records).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// Whether the retention job is scheduled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for the retention job.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Postings older than this many days are removed.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            schedule: default_schedule(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 0 3 * * *".to_string()
}

fn default_retention_days() -> i64 {
    30
}
