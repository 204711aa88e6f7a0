use crate::core::month::Month;
use crate::core::quote::{QuoteSeries, QuoteSource};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedSeries {
    start: Month,
    end: NaiveDate,
    series: QuoteSeries,
}

impl CachedSeries {
    fn covers(&self, start: Month, end: NaiveDate) -> bool {
        self.start <= start && self.end >= end
    }
}

/// Serves repeated requests for a ticker from the widest range fetched so far.
///
/// The aligner asks for `[candidate, end]` with a later candidate on every
/// attempt, so after the first fetch every request is a slice of the cached one.
/// Failures are not cached.
#[derive(Clone)]
pub struct CachingQuoteSource<T: QuoteSource> {
    inner: T,
    cache: Arc<Mutex<HashMap<String, CachedSeries>>>,
}

impl<T: QuoteSource> CachingQuoteSource<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<T: QuoteSource> QuoteSource for CachingQuoteSource<T> {
    async fn fetch(&self, ticker: &str, start: Month, end: NaiveDate) -> Result<QuoteSeries> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(ticker).filter(|c| c.covers(start, end)) {
            debug!("Cache hit for quotes: {}", ticker);
            return Ok(cached.series.between(start, end));
        }

        debug!("Cache miss for quotes: {}", ticker);
        let series = self.inner.fetch(ticker, start, end).await?;
        cache.insert(
            ticker.to_string(),
            CachedSeries {
                start,
                end,
                series: series.clone(),
            },
        );
        Ok(series)
    }
}
