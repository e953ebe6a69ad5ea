//! Long-poll loop feeding chat messages to the command service.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use jobhound_service::CommandService;
use jobhound_service::command::BOT_COMMANDS;

use crate::client::{TelegramClient, TelegramError};
use crate::dispatch::ChatDispatcher;
use crate::types::{BotCommand, Update};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Polls `getUpdates` and hands text messages to a per-chat queue.
#[derive(Clone)]
pub struct TelegramBot {
    client: TelegramClient,
    commands: CommandService,
    poll_timeout_seconds: u64,
    drain_timeout: Duration,
}

impl TelegramBot {
    /// Create a bot.
    pub fn new(client: TelegramClient, commands: CommandService, poll_timeout_seconds: u64) -> Self {
        Self {
            client,
            commands,
            poll_timeout_seconds,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// How long shutdown waits for in-flight commands before aborting them.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Advertise the command menu. Failure only affects the client UI.
    pub async fn register_commands(&self) {
        let commands: Vec<BotCommand> = BOT_COMMANDS
            .iter()
            .map(|(command, description)| BotCommand {
                command: (*command).to_string(),
                description: (*description).to_string(),
            })
            .collect();

        match self.client.set_my_commands(&commands).await {
            Ok(()) => tracing::info!("Telegram commands configured"),
            Err(e) => tracing::warn!(error = %e, "Failed to configure Telegram commands"),
        }
    }

    /// Poll until `shutdown` flips to `true`, then let in-flight commands
    /// finish within the drain timeout.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.register_commands().await;
        tracing::info!(timeout = self.poll_timeout_seconds, "Telegram polling started");

        let mut chats = ChatDispatcher::new(self.commands.clone());
        let mut offset: Option<i64> = None;
        loop {
            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                polled = self.client.get_updates(offset, self.poll_timeout_seconds) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        dispatch(&mut chats, update);
                    }
                }
                Err(e) => {
                    let backoff = match &e {
                        TelegramError::Api {
                            retry_after: Some(secs),
                            ..
                        } => Duration::from_secs(*secs),
                        _ => ERROR_BACKOFF,
                    };
                    tracing::error!(error = %e, backoff_secs = backoff.as_secs(), "Polling error");
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                        _ = time::sleep(backoff) => {}
                    }
                }
            }
        }

        tracing::info!(active_chats = chats.active_chats(), "Telegram polling stopped");
        chats.shutdown(self.drain_timeout).await;
    }
}

fn dispatch(chats: &mut ChatDispatcher<CommandService>, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(text) = message.text else {
        return;
    };
    chats.dispatch(message.chat.id.to_string(), text);
}
