//! Chat command surface.

pub mod intent;
pub mod service;

pub use intent::{Intent, classify};
pub use service::{BOT_COMMANDS, CommandService, scan_summary};
