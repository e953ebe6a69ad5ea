//! Outbound messaging transport.

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a failed send, classified by what the caller should do next.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// The recipient can never be reached (blocked the bot, chat deleted).
    #[error("recipient unreachable: {0}")]
    Permanent(String),
    /// This one message failed; the recipient may still be reachable.
    #[error("send failed: {0}")]
    Transient(String),
    /// The transport itself is failing (network, rate limit, 5xx).
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl SendError {
    /// Whether the recipient should be deactivated.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// A channel capable of delivering a text message to an external recipient id.
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    /// Deliver `message` to `recipient` (the user's external id).
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError>;

    /// Transport name for logging.
    fn name(&self) -> &str;
}
