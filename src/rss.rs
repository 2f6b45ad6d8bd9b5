use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed, Link, Text};
use feed_rs::parser;
use futures::future::join_all;
use reqwest::{redirect, Client};
use tracing::{debug, info, warn};

use crate::item::{collapse_whitespace, strip_html, NewsItem};
use crate::source::{FetchError, HttpSettings, Source, MAX_REDIRECTS};

/// Fetches a fixed, ordered list of RSS/Atom feeds.
pub struct RssSource {
    client: Client,
    feeds: Vec<String>,
}

impl RssSource {
    pub fn new(feeds: Vec<String>, http: &HttpSettings) -> Result<Self, FetchError> {
        let client = http.build_client(redirect::Policy::limited(MAX_REDIRECTS))?;
        Ok(Self { client, feeds })
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<NewsItem>, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        let parsed = parser::parse(&bytes[..])?;

        Ok(normalize_feed(parsed, url, Utc::now()))
    }
}

#[async_trait]
impl Source for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch(&self) -> Vec<NewsItem> {
        let results = join_all(self.feeds.iter().map(|url| self.fetch_feed(url))).await;

        let mut items = Vec::new();
        for (url, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(feed_items) => {
                    debug!(feed = %url, count = feed_items.len(), "Fetched feed");
                    items.extend(feed_items);
                }
                Err(e) => warn!(feed = %url, error = %e, "Failed to fetch feed"),
            }
        }

        info!("Fetched {} items from {} feeds", items.len(), self.feeds.len());
        items
    }
}

/// Convert a parsed feed into news items, dropping entries without a link.
pub fn normalize_feed(feed: Feed, feed_url: &str, fetched_at: DateTime<Utc>) -> Vec<NewsItem> {
    let source = feed_label(&feed, feed_url);

    feed.entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, &source, fetched_at))
        .collect()
}

fn normalize_entry(entry: &Entry, source: &str, fetched_at: DateTime<Utc>) -> Option<NewsItem> {
    let link = primary_link(&entry.links)?;

    let title = entry.title.as_ref().map(plain_text).unwrap_or_default();

    // The short snippet reads better than full article bodies.
    let summary = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
        .unwrap_or_default();

    let published: DateTime<Utc> = entry
        .published
        .or(entry.updated)
        .unwrap_or(fetched_at);

    NewsItem::new(&title, &link, source, published, &strip_html(summary))
}

/// Text constructs are only markup when typed as HTML; plain ones were
/// already unescaped by the XML parser.
fn plain_text(text: &Text) -> String {
    match text.content_type.essence().to_string().as_str() {
        "text/html" | "application/xhtml+xml" => strip_html(&text.content),
        _ => collapse_whitespace(&text.content),
    }
}

/// The article link: the alternate (or untyped) link if present, else the first.
pub fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Feed title, else the host of the feed's own link, else the host of the feed URL.
pub fn feed_label(feed: &Feed, feed_url: &str) -> String {
    feed.title
        .as_ref()
        .map(plain_text)
        .filter(|t| !t.is_empty())
        .or_else(|| feed.links.first().and_then(|l| hostname(&l.href)))
        .or_else(|| hostname(feed_url))
        .unwrap_or_else(|| feed_url.to_string())
}

fn hostname(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
