//! Minimal Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use jobhound_core::config::telegram::TelegramConfig;
use jobhound_core::error::{AppError, ErrorKind};

use crate::types::{ApiResponse, BotCommand, Update};

/// Failure talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bad or missing configuration.
    #[error("Telegram configuration error: {0}")]
    Config(String),

    /// The request never produced a usable response.
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok: false` or a non-JSON error page.
    #[error("Telegram API error ({status}): {description}")]
    Api {
        /// HTTP status, or the API `error_code` when present.
        status: u16,
        /// API description of the failure.
        description: String,
        /// `parameters.retry_after` on rate limiting.
        retry_after: Option<u64>,
    },
}

impl From<TelegramError> for AppError {
    fn from(err: TelegramError) -> Self {
        let kind = match &err {
            TelegramError::Config(_) => ErrorKind::Configuration,
            TelegramError::Api { status: 429, .. } => ErrorKind::RateLimit,
            _ => ErrorKind::ExternalService,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

/// Resolve a `${VAR}` token reference from the environment; literal tokens
/// pass through.
pub fn resolve_token(raw: &str) -> Result<String, TelegramError> {
    let token = if raw.starts_with("${") {
        let var = raw
            .strip_prefix("${")
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| TelegramError::Config(format!("Malformed env var reference: {raw}")))?;
        std::env::var(var).map_err(|_| {
            TelegramError::Config(format!("Environment variable '{var}' is not set"))
        })?
    } else {
        raw.to_string()
    };

    if token.trim().is_empty() {
        return Err(TelegramError::Config(
            "Telegram bot token must not be empty".to_string(),
        ));
    }
    Ok(token)
}

/// HTTP client bound to one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
    send_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Build a client from configuration, resolving the token.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let token = resolve_token(&config.bot_token)?;
        Ok(Self {
            http: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            send_timeout: Duration::from_secs(config.send_timeout_seconds),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) => {
                return Err(TelegramError::Api {
                    status,
                    description: format!("unexpected response body for {method}"),
                    retry_after: None,
                });
            }
        };

        if envelope.ok {
            if let Some(result) = envelope.result {
                return Ok(result);
            }
        }

        Err(TelegramError::Api {
            status: envelope.error_code.unwrap_or(status),
            description: envelope
                .description
                .unwrap_or_else(|| "Unknown Telegram API error".to_string()),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        })
    }

    /// `sendMessage`.
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = Value::String(mode.to_string());
        }

        tracing::debug!(chat_id, parse_mode = ?parse_mode, "Sending Telegram message");
        let _: Value = self.call("sendMessage", &body, self.send_timeout).await?;
        Ok(())
    }

    /// `getUpdates` long poll starting at `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout_seconds,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        // The HTTP timeout must outlast the server-side long poll.
        let timeout = Duration::from_secs(timeout_seconds) + self.send_timeout;
        self.call("getUpdates", &body, timeout).await
    }

    /// `setMyCommands` for the default scope.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let body = json!({ "commands": commands });
        let _: Value = self.call("setMyCommands", &body, self.send_timeout).await?;
        Ok(())
    }
}
