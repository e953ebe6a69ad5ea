//! Classifying inbound chat text into a closed set of intents.

use jobhound_core::Keyword;
use jobhound_core::types::keyword::split_keywords;

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `/start`: create or reactivate the user.
    Subscribe,
    /// `/stop`: deactivate the user.
    Unsubscribe,
    /// `/set k1 k2` or bare text. Empty when `/set` had no arguments.
    SetKeywords(Vec<Keyword>),
    /// `/scan`.
    ManualScan,
    /// `/preferences`.
    ViewPreferences,
    /// `/clear`.
    ClearPreferences,
}

/// Classify one message. Returns `None` for blank text and unknown commands.
pub fn classify(text: &str) -> Option<Intent> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(command_line) = text.strip_prefix('/') else {
        let keywords = split_keywords(text);
        return (!keywords.is_empty()).then_some(Intent::SetKeywords(keywords));
    };

    let (head, args) = command_line
        .split_once(char::is_whitespace)
        .unwrap_or((command_line, ""));
    // Group chats address commands as `/scan@SomeBot`.
    let command = head.split('@').next().unwrap_or(head).to_lowercase();

    match command.as_str() {
        "start" => Some(Intent::Subscribe),
        "stop" => Some(Intent::Unsubscribe),
        "set" => Some(Intent::SetKeywords(split_keywords(args))),
        "scan" => Some(Intent::ManualScan),
        "preferences" => Some(Intent::ViewPreferences),
        "clear" => Some(Intent::ClearPreferences),
        _ => None,
    }
}
