use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<PgPool> {
    let timeout = config.db.statement_timeout_ms.to_string();

    // 0 disables the timeout. Buckets are truncated in UTC.
    let options = PgConnectOptions::from_str(&config.db.url)
        .context("Invalid db.url")?
        .options([("statement_timeout", timeout.as_str()), ("TimeZone", "UTC")]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

/// Columns of the corpus table that the queries rely on, with their types.
pub struct SchemaReport {
    pub table: String,
    pub columns: Vec<(String, String)>,
}

/// Verify the configured corpus table exists with its time and search
/// vector columns.
pub async fn check_schema(pool: &PgPool, config: &Config) -> Result<SchemaReport> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT column_name::text, data_type::text
        FROM information_schema.columns
        WHERE table_name = $1 AND column_name IN ($2, $3)
        ORDER BY column_name
        "#,
    )
    .bind(&config.db.table)
    .bind(&config.db.time_column)
    .bind(&config.db.vector_column)
    .fetch_all(pool)
    .await?;

    for column in [&config.db.time_column, &config.db.vector_column] {
        if !rows.iter().any(|(name, _)| name == column) {
            anyhow::bail!(
                "column '{}' not found on table '{}'",
                column,
                config.db.table
            );
        }
    }

    Ok(SchemaReport {
        table: config.db.table.clone(),
        columns: rows,
    })
}

/// `kwt check`: connect and verify the corpus schema.
pub async fn run_check(config: &Config) -> Result<()> {
    let pool = connect(config).await?;
    let report = check_schema(&pool, config).await?;

    println!("Database:  ok");
    println!("Table:     {}", report.table);
    for (name, data_type) in &report.columns {
        println!("  {:<24} {}", name, data_type);
    }

    pool.close().await;
    Ok(())
}
