//! Analysis pipeline: one request in, per-keyword records and plot-ready
//! series out.
//!
//! The baseline is fetched once per request, then keywords are processed one
//! at a time in request order. Any backend or cache failure aborts the whole
//! request; a keyword without matches is reported as `no_data` instead.

use std::sync::Arc;

use crate::aggregate::KeywordAggregator;
use crate::baseline::BaselineProvider;
use crate::error::{Error, Result};
use crate::models::{Granularity, NormalizedSeries, ResultRecord};
use crate::normalize::{MissingBuckets, SeriesBuilder};
use crate::query::QueryTranslator;
use crate::store::{CacheStore, Corpus};

/// A validated analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Keyword labels as given, trimmed and deduplicated, in request order.
    pub keywords: Vec<String>,
    pub granularity: Granularity,
    /// Trailing smoothing window in buckets; `<= 0` disables smoothing.
    pub rolling: i64,
    /// Bypass and overwrite cached series.
    pub refresh: bool,
}

impl AnalysisRequest {
    pub fn new(
        keywords: Vec<String>,
        granularity: Granularity,
        rolling: i64,
        refresh: bool,
    ) -> Result<Self> {
        let keywords = dedup(keywords.iter().map(|k| k.trim()));
        if keywords.is_empty() {
            return Err(Error::InvalidRequest("no keywords given".into()));
        }
        Ok(Self {
            keywords,
            granularity,
            rolling,
            refresh,
        })
    }

    /// Build a request from its raw form: a comma-separated keyword list and
    /// a time bin name or code.
    pub fn parse(keywords: &str, time_bin: &str, rolling: i64, refresh: bool) -> Result<Self> {
        let granularity = time_bin.parse()?;
        Self::new(split_keywords(keywords), granularity, rolling, refresh)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
/// Duplicates collapse onto their first occurrence.
pub fn split_keywords(raw: &str) -> Vec<String> {
    dedup(raw.split(','))
}

fn dedup<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels.map(str::trim).filter(|l| !l.is_empty()) {
        if !out.iter().any(|seen| seen == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// Outcome of a successful analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub request: AnalysisRequest,
    /// One record per requested keyword, in request order.
    pub records: Vec<ResultRecord>,
    /// One series per keyword with data, in request order.
    pub series: Vec<NormalizedSeries>,
}

impl Analysis {
    /// Chart title listing every requested keyword.
    pub fn title(&self) -> String {
        format!("Posts over time for: {}", self.request.keywords.join(", "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzerOptions {
    /// Cache keyword series with no matches too.
    pub persist_empty_keyword_series: bool,
    pub missing_buckets: MissingBuckets,
}

/// Runs analysis requests against a corpus through a cache.
pub struct Analyzer {
    translator: QueryTranslator,
    baseline: BaselineProvider,
    aggregator: KeywordAggregator,
    builder: SeriesBuilder,
}

impl Analyzer {
    pub fn new(
        translator: QueryTranslator,
        corpus: Arc<dyn Corpus>,
        cache: Arc<dyn CacheStore>,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            translator,
            baseline: BaselineProvider::new(corpus.clone(), cache.clone()),
            aggregator: KeywordAggregator::new(corpus, cache)
                .persist_empty(options.persist_empty_keyword_series),
            builder: SeriesBuilder::new(options.missing_buckets),
        }
    }

    pub fn translator(&self) -> &QueryTranslator {
        &self.translator
    }

    pub fn baseline(&self) -> &BaselineProvider {
        &self.baseline
    }

    pub async fn analyse(&self, request: &AnalysisRequest) -> Result<Analysis> {
        let granularity = request.granularity;
        let baseline = self
            .baseline
            .get_baseline(granularity, request.refresh)
            .await?;

        let mut records = Vec::with_capacity(request.keywords.len());
        let mut series = Vec::new();

        for keyword in &request.keywords {
            let expression = self.translator.resolve(keyword);
            let matches = self
                .aggregator
                .get_series(keyword, &expression, granularity, request.refresh)
                .await?;

            if matches.is_empty() {
                tracing::info!(keyword = %keyword, "no data");
                records.push(ResultRecord::no_data(keyword.as_str()));
                continue;
            }

            records.push(ResultRecord::success(keyword.as_str(), matches.len()));
            series.push(
                self.builder
                    .build(keyword, &matches, &baseline, request.rolling),
            );
        }

        Ok(Analysis {
            request: request.clone(),
            records,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordStatus;
    use crate::store::memory::{InMemoryCache, InMemoryCorpus};
    use crate::store::CacheKey;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn days(n: i64) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i)).collect()
    }

    fn corpus() -> InMemoryCorpus {
        let translator = QueryTranslator::with_defaults();
        let go = translator.resolve("go");
        let rust = translator.resolve("rust");
        InMemoryCorpus::new()
            .with_items(days(30))
            .with_items(days(30))
            .with_matches(go.as_str(), days(30))
            .with_matches(rust.as_str(), days(30))
    }

    #[test]
    fn test_parse_splits_trims_and_dedups() {
        let req = AnalysisRequest::parse(" go, rust ,,go,  ", "D", 7, false).unwrap();
        assert_eq!(req.keywords, vec!["go", "rust"]);
        assert_eq!(req.granularity, Granularity::Day);
        assert_eq!(req.rolling, 7);
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        assert_eq!(split_keywords("Rust,rust"), vec!["Rust", "rust"]);
    }

    #[test]
    fn test_parse_rejects_empty_keywords_and_bad_bin() {
        let err = AnalysisRequest::parse(" , ,", "week", 0, false).unwrap_err();
        assert!(err.is_client_error());
        let err = AnalysisRequest::parse("go", "hourly", 0, false).unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_go_and_rust_daily_smoothed() {
        let corpus = Arc::new(corpus());
        let cache = Arc::new(InMemoryCache::new());
        let analyzer = Analyzer::new(
            QueryTranslator::with_defaults(),
            corpus.clone(),
            cache.clone(),
            AnalyzerOptions::default(),
        );
        let req = AnalysisRequest::parse("go, rust", "day", 7, false).unwrap();

        let analysis = analyzer.analyse(&req).await.unwrap();

        assert_eq!(analysis.records.len(), 2);
        assert!(analysis
            .records
            .iter()
            .all(|r| r.status == KeywordStatus::Success && r.points.unwrap_or(0) > 0));
        assert_eq!(analysis.records[0].points, Some(30));
        assert_eq!(analysis.records[1].points, Some(30));
        assert_eq!(analysis.series.len(), 2);
        assert_eq!(analysis.series[0].label, "go (7-period avg)");
        assert_eq!(analysis.title(), "Posts over time for: go, rust");

        assert_eq!(corpus.baseline_queries(), 1);
        assert_eq!(corpus.keyword_queries(), 2);
        assert!(cache.contains(&CacheKey::baseline(Granularity::Day)));
        assert!(cache.contains(&CacheKey::keyword("go", Granularity::Day)));
        assert!(cache.contains(&CacheKey::keyword("rust", Granularity::Day)));

        // Four items per day, one of them about go.
        let go: Vec<f64> = analysis.series[0].defined_points().map(|(_, v)| v).collect();
        assert_eq!(go.len(), 30 - 6);
        assert!(go.iter().all(|v| (*v - 25.0).abs() < 1e-9));

        // Served entirely from cache the second time.
        analyzer.analyse(&req).await.unwrap();
        assert_eq!(corpus.baseline_queries(), 1);
        assert_eq!(corpus.keyword_queries(), 2);
    }

    #[tokio::test]
    async fn test_no_match_keyword_is_no_data() {
        let corpus = Arc::new(corpus());
        let cache = Arc::new(InMemoryCache::new());
        let analyzer = Analyzer::new(
            QueryTranslator::with_defaults(),
            corpus.clone(),
            cache.clone(),
            AnalyzerOptions::default(),
        );
        let req = AnalysisRequest::parse("zzzznomatch, go", "day", 0, false).unwrap();

        let analysis = analyzer.analyse(&req).await.unwrap();

        assert_eq!(analysis.records[0], ResultRecord::no_data("zzzznomatch"));
        assert_eq!(analysis.records[1].status, KeywordStatus::Success);
        assert_eq!(analysis.series.len(), 1);
        assert!(!cache.contains(&CacheKey::keyword("zzzznomatch", Granularity::Day)));
    }

    #[tokio::test]
    async fn test_sparse_keyword_still_has_smoothed_points() {
        let every_other_day: Vec<_> = days(30).into_iter().step_by(2).collect();
        let corpus = InMemoryCorpus::new()
            .with_items(days(30))
            .with_matches("haskell", every_other_day);
        let analyzer = Analyzer::new(
            QueryTranslator::with_defaults(),
            Arc::new(corpus),
            Arc::new(InMemoryCache::new()),
            AnalyzerOptions::default(),
        );
        let req = AnalysisRequest::parse("haskell", "day", 7, false).unwrap();

        let analysis = analyzer.analyse(&req).await.unwrap();

        assert_eq!(analysis.records[0], ResultRecord::success("haskell", 15));
        let series = &analysis.series[0];
        assert_eq!(series.defined_points().count(), 9);
        assert_eq!(series.segments().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_requeries_everything() {
        let corpus = Arc::new(corpus());
        let analyzer = Analyzer::new(
            QueryTranslator::with_defaults(),
            corpus.clone(),
            Arc::new(InMemoryCache::new()),
            AnalyzerOptions::default(),
        );

        let req = AnalysisRequest::parse("go", "week", 0, false).unwrap();
        analyzer.analyse(&req).await.unwrap();
        let req = AnalysisRequest::parse("go", "week", 0, true).unwrap();
        analyzer.analyse(&req).await.unwrap();

        assert_eq!(corpus.baseline_queries(), 2);
        assert_eq!(corpus.keyword_queries(), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_fails_request() {
        let analyzer = Analyzer::new(
            QueryTranslator::with_defaults(),
            Arc::new(InMemoryCorpus::unavailable()),
            Arc::new(InMemoryCache::new()),
            AnalyzerOptions::default(),
        );
        let req = AnalysisRequest::parse("go", "day", 0, false).unwrap();
        let err = analyzer.analyse(&req).await.unwrap_err();
        assert!(matches!(err, Error::Corpus(_)));
        assert!(!err.is_client_error());
    }
}
