//! Time-bounded memo in front of a single source.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::item::NewsItem;
use crate::source::Source;

/// Default lifetime of a cached fetch.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time source for cache expiry, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry {
    items: Vec<NewsItem>,
    expires_at: Instant,
}

/// Caches the output of one [`Source`] for a fixed TTL.
///
/// The slot lock is never held across a fetch. Two readers that both see
/// an expired slot will both fetch; the last one to finish wins.
pub struct SourceCache {
    source: Arc<dyn Source>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Entry>>,
}

impl SourceCache {
    pub fn new(source: Arc<dyn Source>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn Source>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub async fn get(&self) -> Vec<NewsItem> {
        {
            let slot = self.slot.read().await;
            if let Some(entry) = slot.as_ref() {
                if self.clock.now() < entry.expires_at {
                    return entry.items.clone();
                }
            }
        }

        debug!(source = self.source.name(), "Cache miss, fetching");
        let items = self.source.fetch().await;

        let mut slot = self.slot.write().await;
        *slot = Some(Entry {
            items: items.clone(),
            expires_at: self.clock.now() + self.ttl,
        });

        items
    }

    /// Drop the cached entry so the next `get` fetches.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{ManualClock, StaticSource};
    use super::*;
    use chrono::Utc;

    fn item(link: &str) -> NewsItem {
        NewsItem::new("Title", link, "Test", Utc::now(), "").unwrap()
    }

    fn setup() -> (Arc<StaticSource>, Arc<ManualClock>, SourceCache) {
        let source = Arc::new(StaticSource::new("test", vec![item("https://a.com")]));
        let clock = Arc::new(ManualClock::new());
        let cache = SourceCache::with_clock(source.clone(), DEFAULT_TTL, clock.clone());
        (source, clock, cache)
    }

    #[tokio::test]
    async fn test_first_get_fetches() {
        let (source, _clock, cache) = setup();

        let items = cache.get().await;

        assert_eq!(items.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_within_ttl_uses_cache() {
        let (source, clock, cache) = setup();

        cache.get().await;
        clock.advance(Duration::from_secs(299));
        let items = cache.get().await;

        assert_eq!(items.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_after_ttl_refetches() {
        let (source, clock, cache) = setup();

        cache.get().await;
        clock.advance(Duration::from_secs(301));
        cache.get().await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_expiry_restarts_window() {
        let (source, clock, cache) = setup();

        cache.get().await;
        clock.advance(Duration::from_secs(400));
        cache.get().await;
        clock.advance(Duration::from_secs(100));
        cache.get().await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let (source, _clock, cache) = setup();

        cache.get().await;
        cache.invalidate().await;
        cache.get().await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let source = Arc::new(StaticSource::new("empty", Vec::new()));
        let clock = Arc::new(ManualClock::new());
        let cache = SourceCache::with_clock(source.clone(), DEFAULT_TTL, clock);

        assert!(cache.get().await.is_empty());
        assert!(cache.get().await.is_empty());
        assert_eq!(source.calls(), 1);
    }
}
