//! Storage and corpus abstractions for Keyword Trends.
//!
//! The [`CacheStore`] trait persists count series under a [`CacheKey`]; the
//! [`Corpus`] trait runs the two aggregation queries the pipeline needs.
//! Both are implemented by the application crate (CSV files, PostgreSQL)
//! and by [`memory`] for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CountSeries, Granularity, SearchExpression};

/// What a cache entry holds a series for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheEntity {
    /// Unfiltered item counts of the whole corpus.
    Baseline,
    /// Match counts for a keyword label, as requested (not lowercased).
    Keyword(String),
}

/// Identity of a cache entry: entity plus granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity: CacheEntity,
    pub granularity: Granularity,
}

impl CacheKey {
    pub fn baseline(granularity: Granularity) -> Self {
        Self {
            entity: CacheEntity::Baseline,
            granularity,
        }
    }

    pub fn keyword(label: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            entity: CacheEntity::Keyword(label.into()),
            granularity,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            CacheEntity::Baseline => write!(f, "baseline/{}", self.granularity),
            CacheEntity::Keyword(label) => write!(f, "keyword:{}/{}", label, self.granularity),
        }
    }
}

/// Persistent series cache.
///
/// No expiry and no locking: an entry lives until it is overwritten or
/// removed externally. A write replaces the whole series at once, so
/// concurrent writers of one key race to last-write-wins, never to a
/// partially written entry.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`read`](CacheStore::read) | Fetch a cached series, `None` when absent |
/// | [`write`](CacheStore::write) | Replace the cached series for a key |
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn read(&self, key: &CacheKey) -> Result<Option<CountSeries>>;

    async fn write(&self, key: &CacheKey, series: &CountSeries) -> Result<()>;
}

/// The text corpus being measured.
///
/// Both queries truncate item timestamps to `granularity`, group, count, and
/// return buckets in ascending order.
#[async_trait]
pub trait Corpus: Send + Sync {
    /// Count every item per bucket.
    async fn count_all(&self, granularity: Granularity) -> Result<CountSeries>;

    /// Count items whose search vector matches `expression`, per bucket.
    async fn count_matching(
        &self,
        expression: &SearchExpression,
        granularity: Granularity,
    ) -> Result<CountSeries>;
}
