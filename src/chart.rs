//! SVG line chart of the normalized series of one analysis.
//!
//! One line per keyword with data, drawn in segments: undefined buckets
//! break the line. A segment of a single point is drawn as a dot. Keywords
//! without data get no line and no legend entry, but the chart is still
//! produced.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyword_trends_core::analysis::Analysis;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::ChartsConfig;
use crate::file_cache::slugify;

const DAY_SECS: i64 = 86_400;

/// A rendered chart: where it is on disk and where it is served.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub url: String,
}

/// Render `analysis` into a new SVG file under the chart directory.
pub fn render_chart(config: &ChartsConfig, analysis: &Analysis) -> Result<ChartArtifact> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create chart dir: {}", config.dir.display()))?;

    let name = chart_file_name(&analysis.request.keywords, Utc::now());
    let path = config.dir.join(&name);
    draw(&path, (config.width, config.height), analysis)
        .with_context(|| format!("Failed to render chart {}", path.display()))?;

    tracing::info!(path = %path.display(), series = analysis.series.len(), "rendered chart");
    Ok(ChartArtifact {
        url: format!("{}/{}", config.url_prefix.trim_end_matches('/'), name),
        path,
    })
}

/// `plot_<YYYYmmdd_HHMMSS>_<keywords>_<random>.svg`
pub fn chart_file_name(keywords: &[String], now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "plot_{}_{}_{}.svg",
        now.format("%Y%m%d_%H%M%S"),
        slugify(&keywords.join(" ")),
        &suffix[..8]
    )
}

fn draw(path: &Path, size: (u32, u32), analysis: &Analysis) -> Result<()> {
    let (x_range, y_max) = bounds(analysis);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(analysis.title(), ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Posts per 100 items")
        .x_labels(10)
        .x_label_formatter(&|ts| format_tick(*ts))
        .draw()?;

    for (idx, series) in analysis.series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let mut labelled = false;

        for segment in series.segments() {
            let points: Vec<(i64, f64)> = segment
                .iter()
                .map(|(bucket, value)| (bucket.timestamp(), *value))
                .collect();

            let anno = if points.len() == 1 {
                chart.draw_series(
                    points
                        .iter()
                        .map(|p| Circle::new(*p, 3, color.filled())),
                )?
            } else {
                chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?
            };

            if !labelled {
                anno.label(series.label.clone()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
                labelled = true;
            }
        }
    }

    if !analysis.series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// X range in Unix seconds and the top of the Y axis.
///
/// The X range covers every bucket of every plotted series, padded by a day
/// when it would be empty or a single instant. The Y axis starts at zero and
/// leaves 10% headroom; an all-zero chart gets a unit axis.
fn bounds(analysis: &Analysis) -> (std::ops::Range<i64>, f64) {
    let buckets = analysis
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.bucket.timestamp()));
    let (x_min, x_max) = buckets.fold((i64::MAX, i64::MIN), |(lo, hi), ts| {
        (lo.min(ts), hi.max(ts))
    });
    let x_range = if x_min > x_max {
        let now = Utc::now().timestamp();
        (now - DAY_SECS)..(now + DAY_SECS)
    } else if x_min == x_max {
        (x_min - DAY_SECS)..(x_max + DAY_SECS)
    } else {
        x_min..x_max
    };

    let y_peak = analysis
        .series
        .iter()
        .flat_map(|s| s.defined_points().map(|(_, v)| v))
        .fold(0.0_f64, f64::max);
    let y_max = if y_peak > 0.0 { y_peak * 1.1 } else { 1.0 };

    (x_range, y_max)
}

fn format_tick(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
