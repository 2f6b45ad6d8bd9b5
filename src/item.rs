use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum summary length in characters.
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Appended to summaries that had to be clipped.
pub const ELLIPSIS: &str = "...";

/// Title used when an upstream record has none.
pub const UNTITLED: &str = "Untitled";

/// Width of the hex id derived from a link.
const ID_HEX_LEN: usize = 16;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]*>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// One article or post, normalized across all upstream sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub summary: String,
}

impl NewsItem {
    /// Build an item, deriving its id from `link`.
    ///
    /// Returns `None` when the link is blank. A blank title is replaced
    /// with [`UNTITLED`]. The summary must already be plain text in the
    /// source's own notation; it is only trimmed and clipped here.
    pub fn new(
        title: &str,
        link: &str,
        source: &str,
        published_at: DateTime<Utc>,
        summary: &str,
    ) -> Option<Self> {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }

        let title = collapse_whitespace(title);
        let title = if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };

        Some(Self {
            id: identify(link),
            title,
            link: link.to_string(),
            source: source.to_string(),
            published_at,
            summary: clip_summary(summary.trim()),
        })
    }
}

/// Stable identifier for a link: SHA-256, hex encoded, truncated.
///
/// Unsalted, so ids survive process restarts and can be used as route
/// parameters between a listing and a detail request.
pub fn identify(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(ID_HEX_LEN);
    hex
}

/// Remove markup, decode entities and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let without_tags = RE_TAGS.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WS.replace_all(text, " ").trim().to_string()
}

/// Cap `text` at [`MAX_SUMMARY_CHARS`] characters, ending clipped text
/// with [`ELLIPSIS`].
pub fn clip_summary(text: &str) -> String {
    if text.chars().count() <= MAX_SUMMARY_CHARS {
        return text.to_string();
    }

    let keep = MAX_SUMMARY_CHARS - ELLIPSIS.chars().count();
    let mut clipped: String = text.chars().take(keep).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}
