use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info};

use crate::cache::SourceCache;
use crate::config::Config;
use crate::item::NewsItem;
use crate::reddit::RedditSource;
use crate::rss::RssSource;
use crate::source::{FetchError, HttpSettings};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("source task '{source_name}' failed: {message}")]
    SourceTask {
        source_name: String,
        message: String,
    },
}

/// Merges every cached source into one deduplicated, newest-first feed.
///
/// Sources are queried in parallel but merged in declared order, which
/// decides which copy of a duplicated link survives.
pub struct Aggregator {
    caches: Vec<Arc<SourceCache>>,
}

impl Aggregator {
    pub fn new(caches: Vec<SourceCache>) -> Self {
        Self {
            caches: caches.into_iter().map(Arc::new).collect(),
        }
    }

    /// RSS first, then Reddit: RSS copies win link collisions.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let http = HttpSettings::from_config(config);
        let rss = RssSource::new(config.feed_urls(), &http)?;
        let reddit = RedditSource::new(
            &config.reddit.base_url,
            config.reddit.subreddits.clone(),
            config.reddit.limit,
            &http,
        )?;

        Ok(Self::new(vec![
            SourceCache::new(Arc::new(rss), config.cache_ttl()),
            SourceCache::new(Arc::new(reddit), config.cache_ttl()),
        ]))
    }

    pub fn source_names(&self) -> Vec<String> {
        self.caches.iter().map(|c| c.name().to_string()).collect()
    }

    pub async fn fetch_aggregated_news(&self) -> Result<Vec<NewsItem>, AggregateError> {
        let handles = self.caches.iter().map(|cache| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        });
        let results = join_all(handles).await;

        // Sources never fail; a join error means a source panicked.
        let mut batches = Vec::with_capacity(results.len());
        for (cache, result) in self.caches.iter().zip(results) {
            match result {
                Ok(items) => batches.push(items),
                Err(e) => {
                    error!(source = cache.name(), error = %e, "Source task failed");
                    return Err(AggregateError::SourceTask {
                        source_name: cache.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let merged = merge(batches);
        info!("Aggregated {} items from {} sources", merged.len(), self.caches.len());
        Ok(merged)
    }

    /// Look up one item of the current aggregate by id.
    pub async fn find(&self, id: &str) -> Result<Option<NewsItem>, AggregateError> {
        let items = self.fetch_aggregated_news().await?;
        Ok(items.into_iter().find(|item| item.id == id))
    }

    /// Expire every source cache.
    pub async fn invalidate_all(&self) {
        join_all(self.caches.iter().map(|c| c.invalidate())).await;
    }
}

/// Concatenate batches in order, keep the first item per link, then sort
/// newest first.
///
/// Equal timestamps keep their concatenation order: declared source
/// order, then each source's own order.
pub fn merge(batches: Vec<Vec<NewsItem>>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<(usize, NewsItem)> = batches
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.link.clone()))
        .enumerate()
        .collect();

    items.sort_by_key(|(position, item)| (Reverse(item.published_at), *position));
    items.into_iter().map(|(_, item)| item).collect()
}
