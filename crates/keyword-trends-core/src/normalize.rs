//! Normalization: keyword counts per hundred corpus items, optionally smoothed.
//!
//! The baseline defines the bucket domain; keyword buckets outside the
//! baseline are dropped. What happens to baseline buckets the keyword has no
//! matches in is set by [`MissingBuckets`].

use serde::Deserialize;

use crate::models::{CountSeries, NormalizedPoint, NormalizedSeries};

/// How baseline buckets without any keyword match are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingBuckets {
    /// Left out of the series. The moving average runs over the buckets the
    /// keyword has matches in, and the line is drawn straight across.
    #[default]
    Skip,
    /// Kept as undefined points. They break the line and make any
    /// moving-average window they fall into undefined.
    Gap,
    /// Zero matches.
    Zero,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesBuilder {
    missing: MissingBuckets,
}

impl SeriesBuilder {
    pub fn new(missing: MissingBuckets) -> Self {
        Self { missing }
    }

    /// Join `keyword` onto `baseline`, scale to matches per 100 items and
    /// smooth with a trailing window of `rolling` buckets (`<= 0` disables).
    pub fn build(
        &self,
        label: &str,
        keyword: &CountSeries,
        baseline: &CountSeries,
        rolling: i64,
    ) -> NormalizedSeries {
        let (buckets, scaled): (Vec<_>, Vec<Option<f64>>) = baseline
            .iter()
            .filter_map(|(bucket, total)| {
                let matches = match (keyword.get(&bucket), self.missing) {
                    (Some(n), _) => n,
                    (None, MissingBuckets::Zero) => 0,
                    (None, MissingBuckets::Gap) => return Some((bucket, None)),
                    (None, MissingBuckets::Skip) => return None,
                };
                Some((bucket, scale(matches, total)))
            })
            .unzip();

        let (values, series_label) = if rolling > 0 {
            let window = usize::try_from(rolling).unwrap_or(usize::MAX);
            (
                rolling_mean(&scaled, window),
                format!("{} ({}-period avg)", label, rolling),
            )
        } else {
            (scaled, format!("{} (per 100 posts)", label))
        };

        let points = buckets
            .into_iter()
            .zip(values)
            .map(|(bucket, value)| NormalizedPoint { bucket, value })
            .collect();

        NormalizedSeries {
            keyword: label.to_string(),
            label: series_label,
            points,
        }
    }
}

fn scale(matches: i64, total: i64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(matches as f64 * 100.0 / total as f64)
}

/// Trailing simple moving average.
///
/// Output has the input's length. Position `i` is the mean of
/// `values[i + 1 - window..=i]`, or `None` if that window is not yet full or
/// holds any `None`.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return values.to_vec();
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn series(pairs: &[(u32, i64)]) -> CountSeries {
        pairs.iter().map(|(d, n)| (day(*d), *n)).collect()
    }

    fn values(s: &NormalizedSeries) -> Vec<Option<f64>> {
        s.points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn test_scales_per_hundred_items() {
        let baseline = series(&[(1, 200), (2, 50)]);
        let keyword = series(&[(1, 10), (2, 5)]);
        let s = SeriesBuilder::default().build("rust", &keyword, &baseline, 0);
        assert_eq!(values(&s), vec![Some(5.0), Some(10.0)]);
        assert_eq!(s.label, "rust (per 100 posts)");
        assert_eq!(s.keyword, "rust");
    }

    #[test]
    fn test_zero_total_is_undefined() {
        let baseline = series(&[(1, 0), (2, 10)]);
        let keyword = series(&[(1, 3), (2, 1)]);
        let s = SeriesBuilder::default().build("go", &keyword, &baseline, 0);
        assert_eq!(values(&s), vec![None, Some(10.0)]);
        assert!(s.defined_points().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn test_baseline_is_the_index_domain() {
        let baseline = series(&[(2, 10), (3, 10)]);
        let keyword = series(&[(1, 4), (2, 1)]);

        let s = SeriesBuilder::default().build("go", &keyword, &baseline, 0);
        let buckets: Vec<_> = s.points.iter().map(|p| p.bucket).collect();
        assert_eq!(buckets, vec![day(2)]);
        assert_eq!(values(&s), vec![Some(10.0)]);

        let s = SeriesBuilder::new(MissingBuckets::Gap).build("go", &keyword, &baseline, 0);
        let buckets: Vec<_> = s.points.iter().map(|p| p.bucket).collect();
        assert_eq!(buckets, vec![day(2), day(3)]);
        assert_eq!(values(&s), vec![Some(10.0), None]);
    }

    #[test]
    fn test_sparse_keyword_smooths_over_its_own_buckets() {
        // Matches on every other day of 30: 15 buckets, 9 full windows of 7.
        let all_days: Vec<(u32, i64)> = (1..=30).map(|d| (d, 10)).collect();
        let odd_days: Vec<(u32, i64)> = (1..=30).step_by(2).map(|d| (d, 1)).collect();
        let baseline = series(&all_days);
        let keyword = series(&odd_days);

        let s = SeriesBuilder::default().build("haskell", &keyword, &baseline, 7);
        assert_eq!(s.points.len(), 15);
        let defined: Vec<_> = s.defined_points().collect();
        assert_eq!(defined.len(), 9);
        assert!(defined.iter().all(|(_, v)| (*v - 10.0).abs() < 1e-9));
        assert_eq!(defined[0].0, day(13));
        assert_eq!(s.segments().len(), 1);

        let gap =
            SeriesBuilder::new(MissingBuckets::Gap).build("haskell", &keyword, &baseline, 7);
        assert_eq!(gap.points.len(), 30);
        assert_eq!(gap.defined_points().count(), 0);
    }

    #[test]
    fn test_missing_buckets_as_zero() {
        let baseline = series(&[(1, 10), (2, 10)]);
        let keyword = series(&[(2, 1)]);
        let s = SeriesBuilder::new(MissingBuckets::Zero).build("go", &keyword, &baseline, 0);
        assert_eq!(values(&s), vec![Some(0.0), Some(10.0)]);
    }

    #[test]
    fn test_rolling_three_over_five_points() {
        let input = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(8.0)];
        let out = rolling_mean(&input, 3);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[3], Some(3.0));
        assert_eq!(out[4], Some(5.0));
    }

    #[test]
    fn test_rolling_window_with_gap_is_undefined() {
        let input = vec![Some(1.0), None, Some(3.0), Some(3.0), Some(3.0)];
        let out = rolling_mean(&input, 2);
        assert_eq!(out, vec![None, None, None, Some(3.0), Some(3.0)]);
    }

    #[test]
    fn test_rolling_longer_than_series_is_all_undefined() {
        let out = rolling_mean(&[Some(1.0), Some(2.0)], 5);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn test_smoothed_label_and_non_positive_window() {
        let baseline = series(&[(1, 100), (2, 100), (3, 100)]);
        let keyword = series(&[(1, 1), (2, 2), (3, 3)]);

        let smoothed = SeriesBuilder::default().build("rust", &keyword, &baseline, 2);
        assert_eq!(smoothed.label, "rust (2-period avg)");
        assert_eq!(values(&smoothed), vec![None, Some(1.5), Some(2.5)]);

        let raw = SeriesBuilder::default().build("rust", &keyword, &baseline, -4);
        assert_eq!(raw.label, "rust (per 100 posts)");
        assert_eq!(values(&raw), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_empty_baseline_gives_empty_series() {
        let s = SeriesBuilder::default().build("go", &series(&[(1, 1)]), &CountSeries::new(), 3);
        assert!(s.points.is_empty());
        assert!(s.segments().is_empty());
    }
}
