//! The subset of Bot API objects JobHound reads.

use serde::{Deserialize, Serialize};

/// Envelope returned by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Human-readable error on failure.
    pub description: Option<String>,
    /// Numeric error code on failure.
    pub error_code: Option<u16>,
    /// Extra hints such as `retry_after`.
    pub parameters: Option<ResponseParameters>,
}

/// `ResponseParameters` object.
#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after a 429.
    pub retry_after: Option<u64>,
}

/// One incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id.
    pub update_id: i64,
    /// New incoming message, if any.
    pub message: Option<Message>,
}

/// Incoming message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message id within the chat.
    pub message_id: i64,
    /// Conversation the message belongs to.
    pub chat: Chat,
    /// Text, absent for stickers, photos and the like.
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id, used as the user's external id.
    pub id: i64,
}

/// `BotCommand` for `setMyCommands`.
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    /// Command without the leading slash.
    pub command: String,
    /// Short description shown in the client menu.
    pub description: String,
}
