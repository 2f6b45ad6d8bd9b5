use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::LOCATION;
use reqwest::{redirect, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::item::{collapse_whitespace, NewsItem};
use crate::source::{FetchError, HttpSettings, Source, MAX_REDIRECTS};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

/// Posts are kept as raw JSON so one malformed post can't sink the listing.
#[derive(Debug, Deserialize)]
struct Child {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Post {
    pub title: Option<String>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub is_self: bool,
    pub selftext: Option<String>,
    pub stickied: bool,
    pub created_utc: Option<f64>,
}

/// Fetches the hot listing of a fixed, ordered list of subreddits.
pub struct RedditSource {
    client: Client,
    base_url: String,
    subreddits: Vec<String>,
    limit: u32,
}

impl RedditSource {
    pub fn new(
        base_url: &str,
        subreddits: Vec<String>,
        limit: u32,
        http: &HttpSettings,
    ) -> Result<Self, FetchError> {
        // Redirects are followed by hand in `get_following_redirects`.
        let client = http.build_client(redirect::Policy::none())?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            subreddits,
            limit,
        })
    }

    pub fn subreddits(&self) -> &[String] {
        &self.subreddits
    }

    fn listing_url(&self, subreddit: &str) -> String {
        format!(
            "{}/r/{}/hot.json?limit={}&raw_json=1",
            self.base_url, subreddit, self.limit
        )
    }

    async fn fetch_subreddit(&self, subreddit: &str) -> Result<Vec<NewsItem>, FetchError> {
        let body = self.get_following_redirects(&self.listing_url(subreddit)).await?;
        let listing: Listing = serde_json::from_slice(&body)?;

        let fetched_at = Utc::now();
        let items = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| serde_json::from_value::<Post>(child.data).ok())
            .filter_map(|post| normalize_post(&post, subreddit, &self.base_url, fetched_at))
            .collect();

        Ok(items)
    }

    /// GET `url`, following up to [`MAX_REDIRECTS`] redirects.
    async fn get_following_redirects(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut current = Url::parse(url)?;

        for _ in 0..=MAX_REDIRECTS {
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::MissingLocation)?;
                debug!(from = %current, to = %location, "Following redirect");
                current = current.join(location)?;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status(status));
            }

            return Ok(response.bytes().await?.to_vec());
        }

        Err(FetchError::TooManyRedirects(MAX_REDIRECTS))
    }
}

#[async_trait]
impl Source for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self) -> Vec<NewsItem> {
        let results = join_all(self.subreddits.iter().map(|s| self.fetch_subreddit(s))).await;

        let mut items = Vec::new();
        for (subreddit, result) in self.subreddits.iter().zip(results) {
            match result {
                Ok(posts) => {
                    debug!(subreddit = %subreddit, count = posts.len(), "Fetched subreddit");
                    items.extend(posts);
                }
                Err(e) => warn!(subreddit = %subreddit, error = %e, "Failed to fetch subreddit"),
            }
        }

        info!(
            "Fetched {} posts from {} subreddits",
            items.len(),
            self.subreddits.len()
        );
        items
    }
}

/// Convert a post into a news item.
///
/// Stickied posts, untitled posts and posts without a usable link are dropped.
pub fn normalize_post(
    post: &Post,
    subreddit: &str,
    base_url: &str,
    fetched_at: DateTime<Utc>,
) -> Option<NewsItem> {
    if post.stickied {
        return None;
    }

    let title = post
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())?;

    let permalink = post
        .permalink
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", base_url, p));
    let external = post.url.as_deref().filter(|u| !u.is_empty()).map(String::from);

    let link = if post.is_self {
        permalink.or(external)
    } else {
        external.or(permalink)
    }?;

    // raw_json=1 selftext is markdown, not HTML.
    let summary = if post.is_self {
        collapse_whitespace(post.selftext.as_deref().unwrap_or_default())
    } else {
        String::new()
    };

    let published = post
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .unwrap_or(fetched_at);

    NewsItem::new(
        &title,
        &link,
        &format!("r/{}", subreddit),
        published,
        &summary,
    )
}
