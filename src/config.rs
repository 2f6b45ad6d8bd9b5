use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "NewsFeed/1.0 (News Aggregator)";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Per-source cache lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Timeout for each individual upstream request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Accept self-signed or intercepted certificates from upstreams.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub reddit: RedditConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_invalid_certs() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditConfig {
    #[serde(default)]
    pub subreddits: Vec<String>,
    /// Posts requested per subreddit
    #[serde(default = "default_reddit_limit")]
    pub limit: u32,
    #[serde(default = "default_reddit_base_url")]
    pub base_url: String,
}

fn default_reddit_limit() -> u32 {
    20
}

fn default_reddit_base_url() -> String {
    "https://www.reddit.com".to_string()
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            limit: default_reddit_limit(),
            base_url: default_reddit_base_url(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn feed_urls(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.url.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.accept_invalid_certs);
        assert!(config.feeds.is_empty());
        assert!(config.reddit.subreddits.is_empty());
        assert_eq!(config.reddit.limit, 20);
        assert_eq!(config.reddit.base_url, "https://www.reddit.com");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            cache_ttl_secs = 60
            request_timeout_secs = 5
            accept_invalid_certs = false

            [[feeds]]
            url = "https://example.com/feed.xml"

            [[feeds]]
            url = "https://example.org/rss"

            [reddit]
            subreddits = ["rust", "programming"]
            limit = 10
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.request_timeout_secs, 5);
        assert!(!config.accept_invalid_certs);
        assert_eq!(
            config.feed_urls(),
            vec!["https://example.com/feed.xml", "https://example.org/rss"]
        );
        assert_eq!(config.reddit.subreddits, vec!["rust", "programming"]);
        assert_eq!(config.reddit.limit, 10);
    }

    #[test]
    fn test_feed_order_preserved() {
        let content = r#"
            [[feeds]]
            url = "https://c.example.com/rss"
            [[feeds]]
            url = "https://a.example.com/rss"
            [[feeds]]
            url = "https://b.example.com/rss"
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(
            config.feed_urls(),
            vec![
                "https://c.example.com/rss",
                "https://a.example.com/rss",
                "https://b.example.com/rss"
            ]
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_feed_missing_url() {
        let content = r#"
            [[feeds]]
            name = "No URL"
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_reddit_partial_table_keeps_defaults() {
        let content = r#"
            [reddit]
            subreddits = ["news"]
        "#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.reddit.subreddits, vec!["news"]);
        assert_eq!(config.reddit.limit, 20);
        assert_eq!(config.reddit.base_url, "https://www.reddit.com");
    }
}
