//! Normalized interest keyword.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A keyword trimmed and lowercased, so `"React "` and `"react"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    /// Normalize raw input. Returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// The normalized keyword text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Keyword {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split free text on whitespace and commas into distinct normalized keywords,
/// preserving first-seen order.
pub fn split_keywords(text: &str) -> Vec<Keyword> {
    let mut out: Vec<Keyword> = Vec::new();
    for part in text.split(|c: char| c.is_whitespace() || c == ',') {
        if let Some(kw) = Keyword::parse(part) {
            if !out.contains(&kw) {
                out.push(kw);
            }
        }
    }
    out
}
