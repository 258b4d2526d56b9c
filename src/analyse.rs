//! Running analyses end to end: pipeline, chart, and response.
//!
//! [`run_analysis`] is shared by the HTTP handler and the `kwt analyse`
//! command. The remaining functions are the CLI entry points that print
//! to stdout.

use anyhow::Result;
use keyword_trends_core::analysis::{Analysis, AnalysisRequest, Analyzer};
use keyword_trends_core::models::{Granularity, KeywordStatus, ResultRecord};
use keyword_trends_core::Error;
use serde::Serialize;
use std::sync::Arc;

use crate::chart::{render_chart, ChartArtifact};
use crate::config::{ChartsConfig, Config};
use crate::corpus::PgCorpus;
use crate::db;
use crate::file_cache::CsvCacheStore;

/// Successful analysis as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    /// Public URL of the chart.
    pub image: String,
    pub results: Vec<ResultRecord>,
}

/// Run the pipeline for `request` and render its chart.
///
/// The chart is rendered after all series are gathered; if rendering fails
/// the whole analysis fails.
pub async fn run_analysis(
    analyzer: &Analyzer,
    charts: &ChartsConfig,
    request: &AnalysisRequest,
) -> keyword_trends_core::Result<(Analysis, ChartArtifact)> {
    let analysis = analyzer.analyse(request).await?;

    let charts = charts.clone();
    let to_render = analysis.clone();
    let artifact = tokio::task::spawn_blocking(move || render_chart(&charts, &to_render))
        .await
        .map_err(|e| Error::Chart(anyhow::anyhow!("chart task failed: {}", e)))?
        .map_err(Error::Chart)?;

    Ok((analysis, artifact))
}

impl AnalysisResponse {
    pub fn new(analysis: Analysis, artifact: &ChartArtifact) -> Self {
        Self {
            success: true,
            image: artifact.url.clone(),
            results: analysis.records,
        }
    }
}

/// Analyzer over the configured PostgreSQL corpus and CSV cache.
pub async fn build_analyzer(config: &Config) -> Result<Analyzer> {
    let pool = db::connect(config).await?;
    Ok(Analyzer::new(
        config.translator(),
        Arc::new(PgCorpus::new(pool, config)),
        Arc::new(CsvCacheStore::new(&config.cache.dir)),
        config.analyzer_options(),
    ))
}

pub async fn run_analyse(
    config: &Config,
    keywords: &str,
    bin: &str,
    rolling: i64,
    refresh: bool,
) -> Result<()> {
    // Reject a bad request before touching the database.
    let request = AnalysisRequest::parse(keywords, bin, rolling, refresh)?;
    let analyzer = build_analyzer(config).await?;

    let (analysis, artifact) = run_analysis(&analyzer, &config.charts, &request).await?;

    println!("{}", analysis.title());
    println!();
    println!("  {:<24} {:<8} {:>6}", "KEYWORD", "STATUS", "POINTS");
    for record in &analysis.records {
        let status = match record.status {
            KeywordStatus::Success => "success",
            KeywordStatus::NoData => "no_data",
        };
        let points = record
            .points
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<24} {:<8} {:>6}", record.keyword, status, points);
    }
    println!();
    println!("Chart: {}", artifact.path.display());

    Ok(())
}

pub async fn run_baseline(config: &Config, bin: &str, refresh: bool) -> Result<()> {
    let granularity: Granularity = bin.parse()?;
    let analyzer = build_analyzer(config).await?;

    let baseline = analyzer.baseline().get_baseline(granularity, refresh).await?;

    println!("Baseline ({})", granularity);
    println!("  Buckets:     {}", baseline.len());
    match (baseline.first_bucket(), baseline.last_bucket()) {
        (Some(first), Some(last)) => {
            println!("  First:       {}", first.format("%Y-%m-%d"));
            println!("  Last:        {}", last.format("%Y-%m-%d"));
        }
        _ => println!("  (corpus is empty)"),
    }
    println!("  Total items: {}", baseline.total());

    Ok(())
}

pub fn run_resolve(config: &Config, keyword: &str) -> Result<()> {
    let translator = config.translator();
    let expression = translator.resolve(keyword);
    let origin = if translator.lookup(keyword).is_some() {
        "curated"
    } else {
        "sanitized"
    };

    if expression.is_empty() {
        println!("(empty expression: matches nothing)");
    } else {
        println!("{}", expression);
    }
    println!("source: {}", origin);
    Ok(())
}

pub fn list_keywords(config: &Config) -> Result<()> {
    let translator = config.translator();
    if translator.is_empty() {
        println!("No curated keywords.");
        return Ok(());
    }

    println!("{:<14} EXPRESSION", "KEYWORD");
    for (keyword, expression) in translator.entries() {
        println!("{:<14} {}", keyword, expression);
    }
    Ok(())
}
