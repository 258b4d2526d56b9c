use anyhow::{Context, Result};
use keyword_trends_core::analysis::AnalyzerOptions;
use keyword_trends_core::normalize::MissingBuckets;
use keyword_trends_core::query::QueryTranslator;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Per-statement timeout applied to every pooled connection. 0 disables it.
    #[serde(default)]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_text_search_config")]
    pub text_search_config: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_time_column")]
    pub time_column: String,
    #[serde(default = "default_vector_column")]
    pub vector_column: String,
}

fn default_max_connections() -> u32 {
    5
}
fn default_text_search_config() -> String {
    "english".to_string()
}
fn default_table() -> String {
    "items".to_string()
}
fn default_time_column() -> String {
    "time".to_string()
}
fn default_vector_column() -> String {
    "text_search_vector".to_string()
}

/// Planner hints set for the duration of each keyword scan.
#[derive(Debug, Deserialize, Clone)]
pub struct ParallelConfig {
    #[serde(default = "default_max_workers_per_gather")]
    pub max_workers_per_gather: u32,
    #[serde(default = "default_setup_cost")]
    pub setup_cost: f64,
    #[serde(default = "default_tuple_cost")]
    pub tuple_cost: f64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers_per_gather: default_max_workers_per_gather(),
            setup_cost: default_setup_cost(),
            tuple_cost: default_tuple_cost(),
        }
    }
}

fn default_max_workers_per_gather() -> u32 {
    4
}
fn default_setup_cost() -> f64 {
    1000.0
}
fn default_tuple_cost() -> f64 {
    0.01
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Cache keyword series that have no matches. Off by default, so such
    /// keywords are queried again on every request.
    #[serde(default)]
    pub persist_empty_keyword_series: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            persist_empty_keyword_series: false,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartsConfig {
    #[serde(default = "default_charts_dir")]
    pub dir: PathBuf,
    /// Public URL path under which `dir` is served.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            dir: default_charts_dir(),
            url_prefix: default_url_prefix(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_charts_dir() -> PathBuf {
    PathBuf::from("./static/images")
}
fn default_url_prefix() -> String {
    "/static/images".to_string()
}
fn default_width() -> u32 {
    1800
}
fn default_height() -> u32 {
    900
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AnalysisConfig {
    /// Baseline buckets without keyword matches: `skip` (default), `gap`
    /// or `zero`.
    #[serde(default)]
    pub missing_buckets: MissingBuckets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    /// Seed the curated table with the built-in entries.
    #[serde(default = "default_true")]
    pub include_defaults: bool,
    /// Extra or overriding curated entries: keyword → search expression.
    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            queries: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Defaults for commands that never touch the database
    /// (`resolve`, `keywords`) when no config file is available.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                url: String::new(),
                max_connections: default_max_connections(),
                statement_timeout_ms: 0,
                text_search_config: default_text_search_config(),
                table: default_table(),
                time_column: default_time_column(),
                vector_column: default_vector_column(),
            },
            parallel: ParallelConfig::default(),
            cache: CacheConfig::default(),
            charts: ChartsConfig::default(),
            analysis: AnalysisConfig::default(),
            server: ServerConfig::default(),
            keywords: KeywordsConfig::default(),
        }
    }

    /// Query translator with the configured curated table.
    pub fn translator(&self) -> QueryTranslator {
        let mut translator = if self.keywords.include_defaults {
            QueryTranslator::with_defaults()
        } else {
            QueryTranslator::new()
        };
        translator.extend(self.keywords.queries.iter().map(|(k, v)| (k, v.clone())));
        translator
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            persist_empty_keyword_series: self.cache.persist_empty_keyword_series,
            missing_buckets: self.analysis.missing_buckets,
        }
    }
}

/// Plain SQL identifier: letter or underscore, then letters, digits, underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate db
    if config.db.url.trim().is_empty() {
        anyhow::bail!("db.url must not be empty");
    }
    if config.db.max_connections < 1 {
        anyhow::bail!("db.max_connections must be >= 1");
    }
    for (name, value) in [
        ("db.text_search_config", &config.db.text_search_config),
        ("db.table", &config.db.table),
        ("db.time_column", &config.db.time_column),
        ("db.vector_column", &config.db.vector_column),
    ] {
        if !is_identifier(value) {
            anyhow::bail!(
                "{} must be a plain SQL identifier ([A-Za-z_][A-Za-z0-9_]*), got '{}'",
                name,
                value
            );
        }
    }

    // Validate parallel hints
    if config.parallel.setup_cost < 0.0 || config.parallel.tuple_cost < 0.0 {
        anyhow::bail!("parallel.setup_cost and parallel.tuple_cost must be >= 0");
    }

    // Validate charts
    if config.charts.width == 0 || config.charts.height == 0 {
        anyhow::bail!("charts.width and charts.height must be > 0");
    }
    let prefix = &config.charts.url_prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        anyhow::bail!(
            "charts.url_prefix must be a path below '/', got '{}'",
            config.charts.url_prefix
        );
    }

    // Validate curated keywords
    for (keyword, expression) in &config.keywords.queries {
        if keyword.trim().is_empty() {
            anyhow::bail!("keywords.queries contains an empty keyword");
        }
        if expression.trim().is_empty() {
            anyhow::bail!("keywords.queries.{} must not be empty", keyword);
        }
    }

    Ok(())
}
