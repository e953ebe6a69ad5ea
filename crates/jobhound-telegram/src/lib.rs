//! # jobhound-telegram
//!
//! Telegram Bot API integration: a thin HTTP client, the
//! [`MessageTransport`](jobhound_core::traits::MessageTransport)
//! implementation used for deliveries and replies, and the long-poll loop
//! that feeds inbound chat messages to the command service.

pub mod bot;
pub mod client;
pub mod dispatch;
pub mod transport;
pub mod types;

pub use bot::TelegramBot;
pub use client::{TelegramClient, TelegramError};
pub use dispatch::{ChatDispatcher, ChatHandler};
pub use transport::TelegramTransport;
