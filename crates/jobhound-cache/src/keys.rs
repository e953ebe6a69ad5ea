//! Cache key builders for every JobHound cache entry.
//!
//! Providers add their own namespace prefix on top of these.

use uuid::Uuid;

/// Marker that a user already received the "nothing new" notice recently.
pub fn idle_notice(user_id: Uuid) -> String {
    format!("notice:idle:{user_id}")
}

/// Cross-process lock held while an automatic scan pass runs.
pub fn scan_lock() -> String {
    "lock:scan:auto".to_string()
}

/// Guard against the same user running two manual scans at once.
pub fn manual_scan_guard(user_id: Uuid) -> String {
    format!("lock:scan:manual:{user_id}")
}
