//! In-memory [`CacheStore`] and [`Corpus`] implementations for testing.
//!
//! [`InMemoryCorpus`] has no full-text engine: the items matching an
//! expression are registered up front with
//! [`with_matches`](InMemoryCorpus::with_matches), keyed by the exact
//! expression string. Both types count how often they are hit so tests can
//! assert on cache behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{CountSeries, Granularity, SearchExpression};

use super::{CacheKey, CacheStore, Corpus};

/// In-memory cache keyed by [`CacheKey`].
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CountSeries>>,
    writes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn read(&self, key: &CacheKey) -> Result<Option<CountSeries>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &CacheKey, series: &CountSeries) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory cache lock poisoned"))?;
        entries.insert(key.clone(), series.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory corpus built from item timestamps.
#[derive(Default)]
pub struct InMemoryCorpus {
    items: Vec<DateTime<Utc>>,
    matches: HashMap<String, Vec<DateTime<Utc>>>,
    unavailable: bool,
    baseline_queries: AtomicUsize,
    keyword_queries: AtomicUsize,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A corpus whose every query fails, as if the backend were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Add items to the corpus.
    pub fn with_items(mut self, items: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        self.items.extend(items);
        self
    }

    /// Declare the items matched by `expression`.
    ///
    /// They are also added to the corpus itself, so the baseline always
    /// covers the matches.
    pub fn with_matches(
        mut self,
        expression: &str,
        items: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Self {
        let items: Vec<_> = items.into_iter().collect();
        self.items.extend(items.iter().copied());
        self.matches
            .entry(expression.to_string())
            .or_default()
            .extend(items);
        self
    }

    /// Number of `count_all` calls served.
    pub fn baseline_queries(&self) -> usize {
        self.baseline_queries.load(Ordering::SeqCst)
    }

    /// Number of `count_matching` calls served.
    pub fn keyword_queries(&self) -> usize {
        self.keyword_queries.load(Ordering::SeqCst)
    }
}

fn bucketize(items: &[DateTime<Utc>], granularity: Granularity) -> CountSeries {
    items
        .iter()
        .map(|ts| (granularity.truncate(*ts), 1))
        .collect()
}

#[async_trait]
impl Corpus for InMemoryCorpus {
    async fn count_all(&self, granularity: Granularity) -> Result<CountSeries> {
        if self.unavailable {
            bail!("corpus backend unavailable");
        }
        self.baseline_queries.fetch_add(1, Ordering::SeqCst);
        Ok(bucketize(&self.items, granularity))
    }

    async fn count_matching(
        &self,
        expression: &SearchExpression,
        granularity: Granularity,
    ) -> Result<CountSeries> {
        if self.unavailable {
            bail!("corpus backend unavailable");
        }
        self.keyword_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .matches
            .get(expression.as_str())
            .map(|items| bucketize(items, granularity))
            .unwrap_or_default())
    }
}
