//! Minimal RSS 2.0 model and text cleanup shared by feed-based adapters.

use serde::Deserialize;

use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::AppResult;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

/// One `<item>` of a feed. Unknown elements are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItem {
    /// `<title>`.
    #[serde(default)]
    pub title: Option<String>,
    /// `<link>`.
    #[serde(default)]
    pub link: Option<String>,
    /// `<description>`, often HTML.
    #[serde(default)]
    pub description: Option<String>,
    /// `<dc:creator>`.
    #[serde(rename = "dc:creator", default)]
    pub creator: Option<String>,
    /// `<author>`.
    #[serde(default)]
    pub author: Option<String>,
    /// `<company>`, emitted by some job boards.
    #[serde(default)]
    pub company: Option<String>,
    /// `<category>` elements.
    #[serde(rename = "category", default)]
    pub categories: Vec<String>,
}

impl FeedItem {
    /// The description reduced to plain text.
    pub fn snippet(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(strip_html)
            .filter(|s| !s.is_empty())
    }

    /// First non-blank company-like field.
    pub fn company_name(&self) -> Option<String> {
        [&self.company, &self.creator, &self.author]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Parse an RSS document into its items.
pub fn parse_feed(xml: &str) -> AppResult<Vec<FeedItem>> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| {
        AppError::with_source(ErrorKind::Serialization, format!("Invalid RSS feed: {e}"), e)
    })?;
    Ok(rss.channel.items)
}

/// Drop markup, decode the common entities, and collapse whitespace.
pub fn strip_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
