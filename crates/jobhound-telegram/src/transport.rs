//! [`MessageTransport`] over the Telegram Bot API.

use async_trait::async_trait;
use tracing::{debug, warn};

use jobhound_core::traits::transport::{MessageTransport, SendError};

use crate::client::{TelegramClient, TelegramError};

/// Descriptions Telegram returns for recipients that can never be reached.
const UNREACHABLE_MARKERS: &[&str] = &[
    "bot was blocked",
    "bot was kicked",
    "chat not found",
    "user is deactivated",
    "have no rights to send",
];

/// Map a Bot API failure onto what the delivery pipeline should do.
pub fn classify(err: &TelegramError) -> SendError {
    match err {
        TelegramError::Http(e) => SendError::Unavailable(e.to_string()),
        TelegramError::Config(msg) => SendError::Unavailable(msg.clone()),
        TelegramError::Api {
            status,
            description,
            retry_after,
        } => {
            let lowered = description.to_lowercase();
            if *status == 403 || UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
                SendError::Permanent(description.clone())
            } else if *status == 429 {
                SendError::Unavailable(match retry_after {
                    Some(secs) => format!("{description} (retry after {secs}s)"),
                    None => description.clone(),
                })
            } else if *status == 401 || *status >= 500 {
                SendError::Unavailable(description.clone())
            } else {
                SendError::Transient(description.clone())
            }
        }
    }
}

fn is_markup_error(err: &TelegramError) -> bool {
    matches!(
        err,
        TelegramError::Api { status: 400, description, .. }
            if description.to_lowercase().contains("can't parse entities")
    )
}

/// Sends through [`TelegramClient::send_message`] with the configured parse
/// mode, falling back to plain text when Telegram rejects the markup.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: TelegramClient,
    parse_mode: Option<String>,
}

impl TelegramTransport {
    /// Create a transport.
    pub fn new(client: TelegramClient, parse_mode: Option<String>) -> Self {
        Self { client, parse_mode }
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let first = self
            .client
            .send_message(recipient, message, self.parse_mode.as_deref())
            .await;

        let err = match first {
            Ok(()) => return Ok(()),
            Err(err) if self.parse_mode.is_some() && is_markup_error(&err) => {
                debug!(chat_id = recipient, error = %err, "Markup rejected, resending as plain text");
                match self.client.send_message(recipient, message, None).await {
                    Ok(()) => return Ok(()),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };

        let classified = classify(&err);
        if !classified.is_permanent() {
            warn!(chat_id = recipient, error = %err, "Telegram send failed");
        }
        Err(classified)
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
