//! Keyword aggregator: matching items per bucket for one keyword.
//!
//! Cache-first like the [`BaselineProvider`](crate::baseline::BaselineProvider),
//! keyed by (keyword label, granularity). The one difference is what happens
//! to an empty result: by default it is **not** cached, so a keyword with no
//! matches is queried again on every request until it gains one. Set
//! `persist_empty` to cache empty series like the baseline does.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::models::{CountSeries, Granularity, SearchExpression};
use crate::store::{CacheKey, CacheStore, Corpus};

pub struct KeywordAggregator {
    corpus: Arc<dyn Corpus>,
    cache: Arc<dyn CacheStore>,
    persist_empty: bool,
}

impl KeywordAggregator {
    pub fn new(corpus: Arc<dyn Corpus>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            corpus,
            cache,
            persist_empty: false,
        }
    }

    /// Whether empty series are written to the cache.
    pub fn persist_empty(mut self, persist_empty: bool) -> Self {
        self.persist_empty = persist_empty;
        self
    }

    /// Match counts for `label` using `expression`.
    ///
    /// An empty expression matches nothing: the result is an empty series and
    /// neither the corpus nor the cache is touched.
    pub async fn get_series(
        &self,
        label: &str,
        expression: &SearchExpression,
        granularity: Granularity,
        refresh: bool,
    ) -> Result<CountSeries> {
        if expression.is_empty() {
            tracing::debug!(keyword = label, "empty search expression, skipping query");
            return Ok(CountSeries::new());
        }

        let key = CacheKey::keyword(label, granularity);

        if !refresh {
            if let Some(series) = self.cache.read(&key).await.map_err(Error::Cache)? {
                tracing::debug!(%key, buckets = series.len(), "keyword cache hit");
                return Ok(series);
            }
            tracing::debug!(%key, "keyword cache miss");
        }

        let started = Instant::now();
        let series = self
            .corpus
            .count_matching(expression, granularity)
            .await
            .map_err(Error::Corpus)?;
        tracing::info!(
            %key,
            %expression,
            buckets = series.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computed keyword series"
        );

        if series.is_empty() && !self.persist_empty {
            tracing::debug!(%key, "no matches, not caching empty series");
        } else {
            self.cache.write(&key, &series).await.map_err(Error::Cache)?;
        }
        Ok(series)
    }
}
