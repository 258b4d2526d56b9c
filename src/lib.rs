//! # Keyword Trends
//!
//! Track how often keywords appear over time in a full-text indexed corpus.
//!
//! Keyword matches are counted per time bucket, normalized against the total
//! number of items in the same bucket, optionally smoothed with a trailing
//! moving average, and rendered as an SVG line chart. Counts are cached on
//! disk so repeated analyses only hit the database for what is new.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ PostgreSQL  │──▶│ keyword-trends-  │──▶│  SVG chart   │
//! │ tsvector    │   │ core pipeline    │   │  (plotters)  │
//! └─────────────┘   └────────┬─────────┘   └──────────────┘
//!                            │
//!                  ┌─────────┴─────────┐
//!                  ▼                   ▼
//!             ┌──────────┐       ┌──────────┐
//!             │   CLI    │       │   HTTP   │
//!             │  (kwt)   │       │  (axum)  │
//!             └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kwt check                                 # verify the corpus schema
//! kwt baseline --bin week                   # warm the baseline cache
//! kwt analyse "go, rust" --bin day --rolling 7
//! kwt serve                                 # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection and schema check |
//! | [`corpus`] | PostgreSQL aggregation queries |
//! | [`file_cache`] | CSV series cache |
//! | [`chart`] | SVG chart rendering |
//! | [`analyse`] | Pipeline runner and CLI commands |
//! | [`server`] | HTTP server |
//! | [`stats`] | Cache overview and maintenance |

pub mod analyse;
pub mod chart;
pub mod config;
pub mod corpus;
pub mod db;
pub mod file_cache;
pub mod server;
pub mod stats;
