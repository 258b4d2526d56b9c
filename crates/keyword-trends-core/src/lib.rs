//! # Keyword Trends Core
//!
//! Backend-agnostic logic for Keyword Trends: series models, keyword to
//! search-expression translation, cache-first aggregation, normalization,
//! and the analysis pipeline that ties them together.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or chart rendering.
//! Storage and the corpus are reached through the [`store::CacheStore`] and
//! [`store::Corpus`] traits; the application crate provides the PostgreSQL
//! and CSV implementations, and [`store::memory`] provides in-memory ones.
//!
//! ## Pipeline
//!
//! ```text
//! keywords ──▶ QueryTranslator ──▶ KeywordAggregator ──┐
//!                                                      ├──▶ SeriesBuilder ──▶ Analysis
//! granularity ──────────────────▶ BaselineProvider ────┘
//! ```

pub mod aggregate;
pub mod analysis;
pub mod baseline;
pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod store;

pub use error::{Error, Result};
