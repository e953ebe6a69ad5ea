//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Concurrent consumers on the delivery queue.
    #[serde(default = "default_delivery_concurrency")]
    pub delivery_concurrency: usize,
    /// Concurrent consumers on the scan queue. Automatic scans are
    /// serialized, so anything other than 1 is clamped at startup.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts before a job is parked as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Base delay for retry backoff, multiplied by attempt².
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,
    /// Grace period for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
    /// A job still running this long after its claim is presumed orphaned
    /// by a dead worker and recovered. The scan queue never uses less than
    /// `scanner.scan_lock_ttl_seconds`.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
    /// How often each runner looks for orphaned jobs on its queue.
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            delivery_concurrency: default_delivery_concurrency(),
            scan_concurrency: default_scan_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            max_attempts: default_max_attempts(),
            retry_backoff_seconds: default_retry_backoff(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
            visibility_timeout_seconds: default_visibility_timeout(),
            reclaim_interval_seconds: default_reclaim_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delivery_concurrency() -> usize {
    5
}

fn default_scan_concurrency() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    2
}

fn default_max_attempts() -> i32 {
    3
}

fn default_retry_backoff() -> u64 {
    15
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_visibility_timeout() -> u64 {
    300
}

fn default_reclaim_interval() -> u64 {
    60
}
