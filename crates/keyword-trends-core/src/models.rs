//! Core data models used throughout Keyword Trends.
//!
//! These types represent the time buckets, count series, search expressions,
//! and per-keyword outcomes that flow through the aggregation pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Width of the time buckets that corpus items are grouped into.
///
/// Parses from `day`/`week`/`month` as well as the short codes `D`, `W`
/// and `ME` used by earlier front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// Field name understood by PostgreSQL's `date_trunc`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Truncate a timestamp to the start of its bucket, in UTC.
    ///
    /// Mirrors `date_trunc`: weeks start on Monday, months on the 1st.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        };
        start.and_time(NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "d" => Ok(Granularity::Day),
            "week" | "w" => Ok(Granularity::Week),
            "month" | "m" | "me" => Ok(Granularity::Month),
            other => Err(Error::InvalidRequest(format!(
                "unknown time bin '{}': use day, week, or month",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-bucket item counts, ascending and unique by bucket.
///
/// Used both for the baseline (all items) and for keyword matches. Buckets
/// without any item are absent rather than stored as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountSeries {
    counts: BTreeMap<DateTime<Utc>, i64>,
}

impl CountSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to a bucket, creating it if needed.
    pub fn insert(&mut self, bucket: DateTime<Utc>, count: i64) {
        *self.counts.entry(bucket).or_insert(0) += count;
    }

    pub fn get(&self, bucket: &DateTime<Utc>) -> Option<i64> {
        self.counts.get(bucket).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Buckets and counts in ascending bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, i64)> + '_ {
        self.counts.iter().map(|(bucket, count)| (*bucket, *count))
    }

    pub fn first_bucket(&self) -> Option<DateTime<Utc>> {
        self.counts.keys().next().copied()
    }

    pub fn last_bucket(&self) -> Option<DateTime<Utc>> {
        self.counts.keys().next_back().copied()
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

impl FromIterator<(DateTime<Utc>, i64)> for CountSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, i64)>>(iter: I) -> Self {
        let mut series = CountSeries::new();
        for (bucket, count) in iter {
            series.insert(bucket, count);
        }
        series
    }
}

/// A full-text query string in the backend's `tsquery` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchExpression(String);

impl SearchExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty expression matches nothing and is never sent to the backend.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SearchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome status of a single keyword within an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordStatus {
    Success,
    NoData,
}

/// Per-keyword result of an analysis request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub keyword: String,
    pub status: KeywordStatus,
    /// Number of buckets with at least one match (success only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
}

impl ResultRecord {
    pub fn success(keyword: impl Into<String>, points: usize) -> Self {
        Self {
            keyword: keyword.into(),
            status: KeywordStatus::Success,
            points: Some(points),
        }
    }

    pub fn no_data(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            status: KeywordStatus::NoData,
            points: None,
        }
    }
}

/// One bucket of a normalized series. `None` means undefined at this bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub bucket: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Matches per hundred items over the baseline's buckets, ready to plot.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    /// Keyword label as requested.
    pub keyword: String,
    /// Legend label, e.g. `rust (7-period avg)`.
    pub label: String,
    pub points: Vec<NormalizedPoint>,
}

impl NormalizedSeries {
    /// Points that carry a value.
    pub fn defined_points(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.bucket, v)))
    }

    /// Maximal runs of consecutive defined points.
    ///
    /// Undefined buckets break the line instead of being drawn through.
    pub fn segments(&self) -> Vec<Vec<(DateTime<Utc>, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for point in &self.points {
            match point.value {
                Some(v) => current.push((point.bucket, v)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}
