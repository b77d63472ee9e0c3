use std::time::Duration;

use analysis_core::{AnalysisError, MarketData, MarketDataSource, Period};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Hourly, matching how long the dashboards kept fetched history around
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Time-boxed memoization of another market data source, keyed by ticker and period.
///
/// Failed fetches are never cached.
pub struct CachedMarketData<S> {
    inner: S,
    ttl: Duration,
    entries: DashMap<(String, Period), CacheEntry<MarketData>>,
}

impl<S: MarketDataSource> CachedMarketData<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn with_default_ttl(inner: S) -> Self {
        Self::new(inner, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached period for `ticker`
    pub fn invalidate(&self, ticker: &str) {
        let ticker = ticker.to_uppercase();
        self.entries.retain(|(t, _), _| *t != ticker);
    }

    /// Drop every entry older than the TTL
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| self.is_fresh(entry.cached_at));
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        (Utc::now() - cached_at)
            .to_std()
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }
}

#[async_trait]
impl<S: MarketDataSource> MarketDataSource for CachedMarketData<S> {
    async fn fetch(&self, ticker: &str, period: Period) -> Result<MarketData, AnalysisError> {
        let key = (ticker.to_uppercase(), period);

        if let Some(entry) = self.entries.get(&key) {
            if self.is_fresh(entry.cached_at) {
                tracing::debug!("Market data cache hit for {} ({})", key.0, period);
                return Ok(entry.data.clone());
            }
        }
        self.entries.remove_if(&key, |_, entry| !self.is_fresh(entry.cached_at));

        let data = self.inner.fetch(ticker, period).await?;
        self.purge_expired();
        self.entries.insert(
            key,
            CacheEntry {
                data: data.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(data)
    }
}
