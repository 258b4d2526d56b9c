//! Baseline provider: total corpus items per bucket.
//!
//! The baseline is the normalization denominator. It is computed with one
//! unfiltered aggregation over the whole corpus and cached per granularity.
//! Unlike keyword series, an empty baseline is cached too.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::models::{CountSeries, Granularity};
use crate::store::{CacheKey, CacheStore, Corpus};

pub struct BaselineProvider {
    corpus: Arc<dyn Corpus>,
    cache: Arc<dyn CacheStore>,
}

impl BaselineProvider {
    pub fn new(corpus: Arc<dyn Corpus>, cache: Arc<dyn CacheStore>) -> Self {
        Self { corpus, cache }
    }

    /// Baseline series for `granularity`.
    ///
    /// Served from cache unless `refresh` is set or nothing is cached yet;
    /// otherwise recomputed and written back, overwriting any prior entry.
    pub async fn get_baseline(&self, granularity: Granularity, refresh: bool) -> Result<CountSeries> {
        let key = CacheKey::baseline(granularity);

        if !refresh {
            if let Some(series) = self.cache.read(&key).await.map_err(Error::Cache)? {
                tracing::debug!(%key, buckets = series.len(), "baseline cache hit");
                return Ok(series);
            }
            tracing::debug!(%key, "baseline cache miss");
        }

        let started = Instant::now();
        let series = self
            .corpus
            .count_all(granularity)
            .await
            .map_err(Error::Corpus)?;
        tracing::info!(
            %key,
            buckets = series.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computed baseline"
        );

        self.cache.write(&key, &series).await.map_err(Error::Cache)?;
        Ok(series)
    }
}
