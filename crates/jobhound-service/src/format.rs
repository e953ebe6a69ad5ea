//! Outbound message text.

use chrono::{DateTime, Duration, Utc};

use jobhound_entity::posting::Posting;

/// Characters of description shown before the ellipsis.
pub const DESCRIPTION_BUDGET: usize = 200;

/// Banner for postings surfaced by a manual scan.
pub const MANUAL_BANNER: &str = "🔍 Manual Scan";
/// Banner for postings surfaced by the automatic scan.
pub const AUTOMATIC_BANNER: &str = "🆕 New Job";

/// "just now", "Nh ago" or "Nd ago".
pub fn age_bucket(age: Duration) -> String {
    let hours = age.num_hours();
    let days = hours / 24;
    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else {
        "just now".to_string()
    }
}

/// Cut to [`DESCRIPTION_BUDGET`] characters, appending `...` when cut.
pub fn truncate_description(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(DESCRIPTION_BUDGET).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Escape the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Render the notification for one posting.
pub fn format_posting(
    posting: &Posting,
    keyword: &str,
    is_manual_scan: bool,
    now: DateTime<Utc>,
) -> String {
    let banner = if is_manual_scan {
        MANUAL_BANNER
    } else {
        AUTOMATIC_BANNER
    };
    let company = posting.company.as_deref().unwrap_or("Unknown");

    let mut message = format!(
        "{banner}\n\n*{title}*\n🏢 {company}\n🔖 {keyword} | 📍 {source}\n⏰ Posted: {age}",
        title = escape_markdown(&posting.title),
        company = escape_markdown(company),
        keyword = escape_markdown(keyword),
        source = escape_markdown(&posting.source),
        age = age_bucket(posting.age_at(now)),
    );

    if let Some(description) = posting.description.as_deref().filter(|d| !d.trim().is_empty()) {
        message.push_str("\n\n");
        message.push_str(&escape_markdown(&truncate_description(description.trim())));
    }

    message.push_str(&format!("\n\n[Apply Here]({})", posting.link));
    message
}

/// Notice sent after automatic passes that found nothing new.
pub fn idle_message() -> String {
    "✅ Scan complete. No new jobs found in the last few hours.".to_string()
}
