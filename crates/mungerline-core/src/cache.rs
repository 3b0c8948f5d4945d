//! Short-lived in-memory cache of normalized quotes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::QuoteRecord;

/// How a single normalization call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry if present, otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch, then store the new record.
    Refresh,
    /// Fetch without reading or writing the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: QuoteRecord,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by normalized ticker.
///
/// Only successful records are ever stored; failures always go back upstream.
#[derive(Debug, Clone)]
pub struct QuoteCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// A zero TTL turns every operation into a no-op.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    pub async fn get(&self, key: &str) -> Option<QuoteRecord> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| Instant::now() <= entry.expires_at)
            .map(|entry| entry.record.clone())
    }

    pub async fn put(&self, key: impl Into<String>, record: QuoteRecord) {
        if self.is_disabled() {
            return;
        }

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Prune on insert so distinct tickers cannot accumulate forever.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.into(),
            CacheEntry {
                record,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultReason, ProviderId, Sourced, Ticker, ValueOrigin};

    fn record(code: &str) -> QuoteRecord {
        QuoteRecord::new(
            Ticker::parse(code).expect("valid ticker"),
            ProviderId::Yahoo,
            None,
            100.0,
            "USD",
            Sourced::observed(25.0, ValueOrigin::TrailingPe),
            Sourced::defaulted(0.1, DefaultReason::NoGrowthData),
            None,
        )
        .expect("valid record")
    }

    #[tokio::test]
    async fn stores_and_returns_records() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        assert!(cache.get("AAPL").await.is_none());

        cache.put("AAPL", record("AAPL")).await;
        let hit = cache.get("AAPL").await.expect("cached");
        assert_eq!(hit.ticker.as_str(), "AAPL");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = QuoteCache::new(Duration::from_millis(50));
        cache.put("MSFT", record("MSFT")).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("MSFT").await.is_none());

        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn insert_prunes_expired_entries() {
        let cache = QuoteCache::new(Duration::from_millis(50));
        cache.put("MSFT", record("MSFT")).await;
        cache.put("GOOG", record("GOOG")).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.put("AAPL", record("AAPL")).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get("AAPL").await.is_some());
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = QuoteCache::disabled();
        cache.put("AAPL", record("AAPL")).await;
        assert!(cache.get("AAPL").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn modes_control_reads_and_writes() {
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
        assert_eq!(CacheMode::default(), CacheMode::Use);
    }
}
