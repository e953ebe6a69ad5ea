//! Telegram messaging transport configuration.

use serde::{Deserialize, Serialize};

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. A value of the form `${VAR}` is read from the environment.
    #[serde(default)]
    pub bot_token: String,
    /// Bot API base URL.
    #[serde(default = "default_api_base")]
    pub api_base_url: String,
    /// `parse_mode` for outbound messages (`Markdown`, `MarkdownV2`, `HTML`).
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<String>,
    /// Whether to long-poll for chat commands.
    #[serde(default = "default_true")]
    pub polling_enabled: bool,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
    /// HTTP timeout for `sendMessage`.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    /// Chat that receives operator alerts for jobs that exhausted retries.
    #[serde(default)]
    pub admin_chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_api_base(),
            parse_mode: default_parse_mode(),
            polling_enabled: default_true(),
            poll_timeout_seconds: default_poll_timeout(),
            send_timeout_seconds: default_send_timeout(),
            admin_chat_id: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_parse_mode() -> Option<String> {
    Some("Markdown".to_string())
}

fn default_true() -> bool {
    true
}

fn default_poll_timeout() -> u64 {
    25
}

fn default_send_timeout() -> u64 {
    15
}
