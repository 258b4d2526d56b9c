//! # Keyword Trends CLI (`kwt`)
//!
//! ## Usage
//!
//! ```bash
//! kwt --config ./config/kwt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kwt analyse "<kw1, kw2>"` | Run an analysis and render its chart |
//! | `kwt baseline` | Compute or show the cached baseline |
//! | `kwt resolve <keyword>` | Print the search expression for a keyword |
//! | `kwt keywords` | List curated keywords |
//! | `kwt check` | Verify the database schema |
//! | `kwt cache stats` | Summarize the series cache |
//! | `kwt cache clear` | Delete cached series |
//! | `kwt serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Weekly trend of two languages, smoothed over four weeks
//! kwt analyse "rust, go" --bin week --rolling 4
//!
//! # Recompute everything for daily buckets
//! kwt analyse "python" --bin day --refresh
//!
//! # Drop cached monthly series
//! kwt cache clear --bin month
//! ```

use clap::{Parser, Subcommand};
use keyword_trends::{analyse, config, db, server, stats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Keyword Trends CLI: keyword popularity over time in a full-text
/// indexed corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kwt.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kwt",
    about = "Keyword Trends: keyword popularity over time, normalized and charted",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kwt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis and render its chart.
    ///
    /// Prints one line per keyword with its status and the number of
    /// buckets with matches, then the path of the rendered chart.
    Analyse {
        /// Comma-separated keywords, e.g. "go, rust".
        keywords: String,

        /// Bucket width: day, week, or month (D, W, ME also accepted).
        #[arg(long, default_value = "day")]
        bin: String,

        /// Trailing moving-average window in buckets; 0 disables smoothing.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rolling: i64,

        /// Ignore cached series and recompute them.
        #[arg(long)]
        refresh: bool,
    },

    /// Compute (or read from cache) the baseline and print a summary.
    Baseline {
        #[arg(long, default_value = "day")]
        bin: String,

        #[arg(long)]
        refresh: bool,
    },

    /// Print the search expression a keyword resolves to.
    ///
    /// Does not need a database.
    Resolve { keyword: String },

    /// List curated keywords and their search expressions.
    Keywords,

    /// Connect to the database and verify the corpus table and columns.
    Check,

    /// Inspect or clear the series cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Start the HTTP server.
    Serve,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Summarize cached series per granularity.
    Stats,
    /// Delete cached series.
    Clear {
        /// Only delete series of this bucket width.
        #[arg(long)]
        bin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require a database fall back to defaults
    match &cli.command {
        Commands::Resolve { keyword } => {
            let cfg =
                config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            return analyse::run_resolve(&cfg, keyword);
        }
        Commands::Keywords => {
            let cfg =
                config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            return analyse::list_keywords(&cfg);
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Analyse {
            keywords,
            bin,
            rolling,
            refresh,
        } => {
            analyse::run_analyse(&cfg, &keywords, &bin, rolling, refresh).await?;
        }
        Commands::Baseline { bin, refresh } => {
            analyse::run_baseline(&cfg, &bin, refresh).await?;
        }
        Commands::Check => {
            db::run_check(&cfg).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                stats::run_cache_stats(&cfg).await?;
            }
            CacheAction::Clear { bin } => {
                stats::run_cache_clear(&cfg, bin.as_deref()).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Resolve { .. } | Commands::Keywords => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
