//! Lifecycle and ordering of queued jobs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a job is in its lifecycle.
///
/// `Pending` covers both fresh jobs and jobs waiting out a retry backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    /// Gave up: permanent error or attempts exhausted.
    Failed,
    /// Withdrawn before a worker claimed it, e.g. the recipient unsubscribed.
    Cancelled,
}

impl JobStatus {
    /// Queued or in flight. An active scan job suppresses the next tick.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Will never run again; eligible for housekeeping.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Database and log spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dequeue order within a queue; higher runs first, ties by age.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "job_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    /// Housekeeping.
    Low,
    Normal,
    /// Someone is waiting on the result.
    High,
}

impl JobPriority {
    /// Manual-scan deliveries answer a user who just asked, so they jump
    /// ahead of automatic fan-out.
    pub fn for_delivery(is_manual_scan: bool) -> Self {
        if is_manual_scan { Self::High } else { Self::Normal }
    }

    /// Database and log spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
