//! The contract shared by every upstream source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use thiserror::Error;

use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::item::NewsItem;

/// Maximum number of redirects followed for a single request.
pub const MAX_REDIRECTS: usize = 5;

/// A provider of news items.
///
/// `fetch` is infallible: implementations catch and log their own
/// failures and return whatever subset they managed to collect, which
/// may be empty. One broken upstream never aborts an aggregate.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Vec<NewsItem>;
}

/// Failure of a single upstream request, recorded before it is swallowed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("invalid feed: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    #[error("invalid listing: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("redirect without a Location header")]
    MissingLocation,

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),
}

/// HTTP settings shared by the source fetchers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl HttpSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }

    /// Build a client with these settings and the given redirect policy.
    pub fn build_client(&self, redirects: redirect::Policy) -> Result<Client, FetchError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .redirect(redirects)
            .build()?;
        Ok(client)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}
