//! "Nothing new" notices after empty automatic passes.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use jobhound_cache::keys;
use jobhound_core::AppResult;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_core::traits::transport::{MessageTransport, SendError};
use jobhound_database::store::UserStore;

use crate::format::idle_message;

/// Sends the idle notice at most once per window per user.
///
/// The window is a TTL entry in the cache, so it holds across restarts and
/// across processes sharing a Redis cache.
#[derive(Clone)]
pub struct IdleNotifier {
    users: Arc<dyn UserStore>,
    cache: Arc<dyn CacheProvider>,
    transport: Arc<dyn MessageTransport>,
    window: Duration,
}

impl IdleNotifier {
    /// Create a notifier with the given per-user window.
    pub fn new(
        users: Arc<dyn UserStore>,
        cache: Arc<dyn CacheProvider>,
        transport: Arc<dyn MessageTransport>,
        window: Duration,
    ) -> Self {
        Self {
            users,
            cache,
            transport,
            window,
        }
    }

    /// Notify every active user with preferences who has not been notified
    /// within the window. Returns how many notices were sent.
    pub async fn notify_idle(&self) -> AppResult<usize> {
        let users = self.users.find_active_with_preferences().await?;
        let message = idle_message();
        let mut sent = 0;

        for user in users {
            let key = keys::idle_notice(user.id);
            if !self.cache.set_nx(&key, "1", self.window).await? {
                debug!(user_id = %user.id, "Idle notice already sent in window");
                continue;
            }

            match self.transport.send(&user.external_id, &message).await {
                Ok(()) => sent += 1,
                Err(SendError::Permanent(reason)) => {
                    warn!(user_id = %user.id, %reason, "Recipient unreachable, deactivating");
                    self.users.set_active(user.id, false).await?;
                }
                Err(e) => {
                    // Let the next empty pass try again.
                    if let Err(del) = self.cache.delete(&key).await {
                        warn!(user_id = %user.id, error = %del, "Failed to clear idle marker");
                    }
                    warn!(user_id = %user.id, error = %e, "Idle notice not sent");
                }
            }
        }

        if sent > 0 {
            info!(sent, "Idle notices sent");
        }
        Ok(sent)
    }
}
