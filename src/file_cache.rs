//! On-disk series cache: one CSV file per (entity, granularity).
//!
//! ```text
//! cache/
//! ├── baseline_day.csv                       time_period,total_items
//! ├── baseline_week.csv
//! └── keyword_machine-learning-3f2a9c1e_day.csv   time_period,post_count
//! ```
//!
//! Keyword file names carry a slug of the label for humans and the first
//! 8 hex digits of its SHA-256 so that labels with the same slug never
//! share a file. Writes go to a temporary file in the cache directory and
//! are renamed into place.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use keyword_trends_core::models::{CountSeries, Granularity};
use keyword_trends_core::store::{CacheEntity, CacheKey, CacheStore};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;

/// Longest slug kept in a file name.
const MAX_SLUG_LEN: usize = 48;

/// One CSV row. The count column is `total_items` in baseline files and
/// `post_count` in keyword files.
#[derive(Debug, Deserialize)]
struct CountRow {
    time_period: DateTime<Utc>,
    #[serde(alias = "total_items", alias = "post_count")]
    count: i64,
}

/// A cache file as found on disk.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub granularity: Option<Granularity>,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

pub struct CsvCacheStore {
    dir: PathBuf,
}

impl CsvCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(file_name(key))
    }

    /// Cache files currently on disk, sorted by name. A missing directory is
    /// an empty cache.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache dir: {}", self.dir.display()))
            }
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let file_name = item.file_name().to_string_lossy().to_string();
            if !is_cache_file(&file_name) {
                continue;
            }
            let meta = item.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            entries.push(CacheEntry {
                path: item.path(),
                granularity: granularity_of(&file_name),
                file_name,
                size: meta.len(),
                modified: meta.modified().ok(),
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    /// Delete cache files, all of them or only those of one granularity.
    /// Returns the number of files removed.
    pub async fn clear(&self, granularity: Option<Granularity>) -> Result<usize> {
        let mut removed = 0;
        for entry in self.entries().await? {
            if granularity.is_some() && entry.granularity != granularity {
                continue;
            }
            tokio::fs::remove_file(&entry.path)
                .await
                .with_context(|| format!("Failed to remove {}", entry.path.display()))?;
            removed += 1;
        }
        tracing::info!(removed, dir = %self.dir.display(), "cleared cache");
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for CsvCacheStore {
    async fn read(&self, key: &CacheKey) -> Result<Option<CountSeries>> {
        let path = self.path_for(key);
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to open {}", path.display())),
        };

        let context = || format!("Failed to parse cache file {}", path.display());
        let rows = csv_async::AsyncReaderBuilder::new()
            .has_headers(true)
            .create_deserializer(file)
            .into_deserialize::<CountRow>();
        let mut rows = std::pin::pin!(rows);

        let mut series = CountSeries::new();
        while let Some(row) = rows.next().await {
            let row = row.with_context(context)?;
            series.insert(row.time_period, row.count);
        }

        Ok(Some(series))
    }

    async fn write(&self, key: &CacheKey, series: &CountSeries) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;

        let name = file_name(key);
        let target = self.dir.join(&name);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        let body = encode(key, series).await?;
        let written: std::io::Result<()> = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to write {}", target.display()));
        }

        tracing::info!(%key, buckets = series.len(), path = %target.display(), "cached series");
        Ok(())
    }
}

async fn encode(key: &CacheKey, series: &CountSeries) -> Result<Vec<u8>> {
    let count_column = match key.entity {
        CacheEntity::Baseline => "total_items",
        CacheEntity::Keyword(_) => "post_count",
    };

    let mut writer = csv_async::AsyncWriterBuilder::new().create_writer(Vec::new());
    writer.write_record(&["time_period", count_column]).await?;
    for (time_period, count) in series.iter() {
        writer
            .write_record(&[time_period.to_rfc3339(), count.to_string()])
            .await?;
    }

    writer
        .into_inner()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to flush cache buffer: {}", e))
}

/// Deterministic file name for a cache key.
pub fn file_name(key: &CacheKey) -> String {
    match &key.entity {
        CacheEntity::Baseline => format!("baseline_{}.csv", key.granularity),
        CacheEntity::Keyword(label) => {
            let digest = Sha256::digest(label.as_bytes());
            let hash: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
            format!("keyword_{}-{}_{}.csv", slugify(label), hash, key.granularity)
        }
    }
}

/// Lowercase ASCII alphanumerics, runs of anything else collapsed to `-`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::new();
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "kw".to_string()
    } else {
        slug.to_string()
    }
}

fn is_cache_file(name: &str) -> bool {
    !name.starts_with('.')
        && name.ends_with(".csv")
        && (name.starts_with("baseline_") || name.starts_with("keyword_"))
}

fn granularity_of(name: &str) -> Option<Granularity> {
    let stem = name.strip_suffix(".csv")?;
    let (_, suffix) = stem.rsplit_once('_')?;
    Granularity::ALL
        .into_iter()
        .find(|g| g.as_str() == suffix)
}
