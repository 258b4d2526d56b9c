//! Cache overview and maintenance.
//!
//! `kwt cache stats` lists what is cached per granularity with file sizes
//! and ages; `kwt cache clear` deletes entries so the next analysis
//! recomputes them from the corpus.

use anyhow::Result;
use keyword_trends_core::models::Granularity;

use crate::config::Config;
use crate::file_cache::CsvCacheStore;

/// Per-granularity breakdown of cache files.
struct GranularityStats {
    granularity: Granularity,
    baseline: bool,
    keyword_files: usize,
    bytes: u64,
    newest_ts: Option<i64>,
}

/// Run the stats command: scan the cache directory and print a summary.
pub async fn run_cache_stats(config: &Config) -> Result<()> {
    let store = CsvCacheStore::new(&config.cache.dir);
    let entries = store.entries().await?;

    let total_bytes: u64 = entries.iter().map(|e| e.size).sum();

    println!("Keyword Trends Cache");
    println!("====================");
    println!();
    println!("  Directory:   {}", store.dir().display());
    println!("  Files:       {}", entries.len());
    println!("  Size:        {}", format_bytes(total_bytes));

    let stats: Vec<GranularityStats> = Granularity::ALL
        .into_iter()
        .map(|granularity| {
            let files: Vec<_> = entries
                .iter()
                .filter(|e| e.granularity == Some(granularity))
                .collect();
            GranularityStats {
                granularity,
                baseline: files.iter().any(|e| e.file_name.starts_with("baseline_")),
                keyword_files: files
                    .iter()
                    .filter(|e| e.file_name.starts_with("keyword_"))
                    .count(),
                bytes: files.iter().map(|e| e.size).sum(),
                newest_ts: files
                    .iter()
                    .filter_map(|e| e.modified)
                    .map(|m| chrono::DateTime::<chrono::Utc>::from(m).timestamp())
                    .max(),
            }
        })
        .collect();

    println!();
    println!("  By granularity:");
    println!(
        "  {:<8} {:>8} {:>8} {:>10}   {}",
        "BIN", "BASELINE", "KEYWORDS", "SIZE", "LAST WRITE"
    );
    println!("  {}", "-".repeat(60));

    for s in &stats {
        let written = match s.newest_ts {
            Some(ts) => format_ts_relative(ts),
            None => "never".to_string(),
        };
        println!(
            "  {:<8} {:>8} {:>8} {:>10}   {}",
            s.granularity.as_str(),
            if s.baseline { "yes" } else { "no" },
            s.keyword_files,
            format_bytes(s.bytes),
            written
        );
    }

    println!();
    Ok(())
}

/// Run the clear command, for one granularity or all of them.
pub async fn run_cache_clear(config: &Config, bin: Option<&str>) -> Result<()> {
    let granularity = bin.map(str::parse::<Granularity>).transpose()?;
    let store = CsvCacheStore::new(&config.cache.dir);
    let removed = store.clear(granularity).await?;

    match granularity {
        Some(g) => println!("Removed {} cache file(s) for bin '{}'.", removed, g),
        None => println!("Removed {} cache file(s).", removed),
    }
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
