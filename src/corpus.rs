//! PostgreSQL corpus backend.
//!
//! Items live in one table with a Unix-epoch timestamp column and a
//! precomputed `tsvector` column. Both aggregations bucket with
//! `date_trunc(<granularity>, to_timestamp(<time>))`; the keyword scan
//! filters with `<vector> @@ to_tsquery(<config>, <expression>)`.
//!
//! Table and column names are interpolated into the SQL. They come from
//! configuration and are validated as plain identifiers in
//! [`load_config`](crate::config::load_config); everything user-supplied is
//! bound as a parameter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyword_trends_core::models::{CountSeries, Granularity, SearchExpression};
use keyword_trends_core::store::Corpus;
use sqlx::PgPool;

use crate::config::{Config, DbConfig, ParallelConfig};

pub struct PgCorpus {
    pool: PgPool,
    text_search_config: String,
    parallel: ParallelConfig,
    count_all_sql: String,
    count_matching_sql: String,
}

impl PgCorpus {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            text_search_config: config.db.text_search_config.clone(),
            parallel: config.parallel.clone(),
            count_all_sql: count_all_sql(&config.db),
            count_matching_sql: count_matching_sql(&config.db),
        }
    }
}

/// Baseline aggregation. `$1` is the `date_trunc` field.
fn count_all_sql(db: &DbConfig) -> String {
    format!(
        "SELECT date_trunc($1, to_timestamp({time})) AS time_period, COUNT(*) AS total_items \
         FROM {table} \
         GROUP BY time_period \
         ORDER BY time_period ASC",
        time = db.time_column,
        table = db.table,
    )
}

/// Keyword aggregation. `$1` is the `date_trunc` field, `$2` the text search
/// configuration, `$3` the search expression.
fn count_matching_sql(db: &DbConfig) -> String {
    format!(
        "SELECT date_trunc($1, to_timestamp({time})) AS time_period, COUNT(*) AS post_count \
         FROM {table} \
         WHERE {vector} @@ to_tsquery($2::regconfig, $3) \
         GROUP BY time_period \
         ORDER BY time_period ASC",
        time = db.time_column,
        table = db.table,
        vector = db.vector_column,
    )
}

/// `SET LOCAL` statements issued before each keyword scan.
///
/// SET does not take bind parameters; the values are numbers from config.
fn parallel_hints(parallel: &ParallelConfig) -> [String; 3] {
    [
        format!(
            "SET LOCAL max_parallel_workers_per_gather = {}",
            parallel.max_workers_per_gather
        ),
        format!("SET LOCAL parallel_setup_cost = {}", parallel.setup_cost),
        format!("SET LOCAL parallel_tuple_cost = {}", parallel.tuple_cost),
    ]
}

/// Rows with a NULL timestamp have no bucket and are left out.
fn to_series(rows: Vec<(Option<DateTime<Utc>>, i64)>) -> CountSeries {
    rows.into_iter()
        .filter_map(|(bucket, count)| bucket.map(|b| (b, count)))
        .collect()
}

#[async_trait]
impl Corpus for PgCorpus {
    async fn count_all(&self, granularity: Granularity) -> Result<CountSeries> {
        let rows: Vec<(Option<DateTime<Utc>>, i64)> = sqlx::query_as(&self.count_all_sql)
            .bind(granularity.as_str())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("baseline query failed ({})", granularity))?;
        Ok(to_series(rows))
    }

    async fn count_matching(
        &self,
        expression: &SearchExpression,
        granularity: Granularity,
    ) -> Result<CountSeries> {
        let mut tx = self.pool.begin().await?;

        for hint in parallel_hints(&self.parallel) {
            sqlx::query(&hint).execute(&mut *tx).await?;
        }

        let rows: Vec<(Option<DateTime<Utc>>, i64)> = sqlx::query_as(&self.count_matching_sql)
            .bind(granularity.as_str())
            .bind(&self.text_search_config)
            .bind(expression.as_str())
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("keyword query failed for '{}'", expression))?;

        tx.commit().await?;
        Ok(to_series(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_null_buckets_are_dropped() {
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let series = to_series(vec![(None, 7), (Some(day), 3)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(&day), Some(3));
    }

    #[test]
    fn test_baseline_sql_uses_configured_names() {
        let mut db = Config::minimal().db;
        db.table = "posts".into();
        db.time_column = "created".into();

        let sql = count_all_sql(&db);
        assert!(sql.starts_with("SELECT date_trunc($1, to_timestamp(created)) AS time_period"));
        assert!(sql.contains("COUNT(*) AS total_items FROM posts GROUP BY time_period"));
        assert!(sql.ends_with("ORDER BY time_period ASC"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_keyword_sql_binds_config_and_expression() {
        let db = Config::minimal().db;

        let sql = count_matching_sql(&db);
        assert!(sql.contains("date_trunc($1, to_timestamp(time)) AS time_period"));
        assert!(sql.contains("COUNT(*) AS post_count FROM items"));
        assert!(sql.contains("WHERE text_search_vector @@ to_tsquery($2::regconfig, $3)"));
        assert!(sql.ends_with("GROUP BY time_period ORDER BY time_period ASC"));
    }

    #[test]
    fn test_parallel_hints_render_defaults() {
        let hints = parallel_hints(&ParallelConfig::default());
        assert_eq!(
            hints,
            [
                "SET LOCAL max_parallel_workers_per_gather = 4".to_string(),
                "SET LOCAL parallel_setup_cost = 1000".to_string(),
                "SET LOCAL parallel_tuple_cost = 0.01".to_string(),
            ]
        );

        let tuned = ParallelConfig {
            max_workers_per_gather: 0,
            setup_cost: 12.5,
            tuple_cost: 0.0,
        };
        assert_eq!(
            parallel_hints(&tuned),
            [
                "SET LOCAL max_parallel_workers_per_gather = 0".to_string(),
                "SET LOCAL parallel_setup_cost = 12.5".to_string(),
                "SET LOCAL parallel_tuple_cost = 0".to_string(),
            ]
        );
    }
}
