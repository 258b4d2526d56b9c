//! HTTP server for keyword trend analyses.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyse` | Run an analysis and render its chart |
//! | `GET`  | `/keywords` | Curated keyword labels |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/static/images/*` | Rendered charts (path from `[charts].url_prefix`) |
//!
//! # Request
//!
//! ```json
//! { "keywords": "go, rust", "timeBin": "D", "rolling": 7, "refresh": false }
//! ```
//!
//! `timeBin` also accepts `time_bin` and the names `day`, `week`, `month`.
//! `rolling` may be a number or a numeric string.
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": "invalid request: missing field 'keywords'" }
//! ```
//!
//! Malformed requests are `400`; backend, cache, and chart failures are `500`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use keyword_trends_core::analysis::{AnalysisRequest, Analyzer};
use keyword_trends_core::store::Corpus;
use keyword_trends_core::Error;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::analyse::{run_analysis, AnalysisResponse};
use crate::config::Config;
use crate::corpus::PgCorpus;
use crate::db;
use crate::file_cache::CsvCacheStore;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    analyzer: Arc<Analyzer>,
}

/// Starts the HTTP server against the configured PostgreSQL corpus.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let corpus = Arc::new(PgCorpus::new(pool, config));
    run_server_with_corpus(config, corpus).await
}

/// Starts the HTTP server against any [`Corpus`].
///
/// The cache is always the CSV store in `[cache].dir`.
pub async fn run_server_with_corpus(
    config: &Config,
    corpus: Arc<dyn Corpus>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    std::fs::create_dir_all(&config.charts.dir)?;

    let analyzer = Analyzer::new(
        config.translator(),
        corpus,
        Arc::new(CsvCacheStore::new(&config.cache.dir)),
        config.analyzer_options(),
    );

    let state = AppState {
        config: config.clone(),
        analyzer: Arc::new(analyzer),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/analyse", post(handle_analyse))
        .route("/keywords", get(handle_keywords))
        .route("/health", get(handle_health))
        .nest_service(
            config.charts.url_prefix.trim_end_matches('/'),
            ServeDir::new(&config.charts.dir),
        )
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Keyword Trends listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Pipeline error rendered as `{success: false, error}`.
struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "analysis failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidRequest(message.into())
}

/// Build an [`AnalysisRequest`] from a JSON body.
fn parse_request(body: &Value) -> Result<AnalysisRequest, Error> {
    let body = body
        .as_object()
        .ok_or_else(|| invalid("body must be a JSON object"))?;

    let keywords = match body.get("keywords") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().ok_or_else(|| invalid("keywords must be strings")))
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
        Some(_) => return Err(invalid("keywords must be a string")),
        None => return Err(invalid("missing field 'keywords'")),
    };

    let time_bin = body
        .get("timeBin")
        .or_else(|| body.get("time_bin"))
        .ok_or_else(|| invalid("missing field 'timeBin'"))?
        .as_str()
        .ok_or_else(|| invalid("timeBin must be a string"))?;

    let rolling = match body.get("rolling") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| invalid("rolling must be an integer"))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("rolling must be an integer, got '{}'", s)))?,
        Some(_) => return Err(invalid("rolling must be an integer")),
        None => return Err(invalid("missing field 'rolling'")),
    };

    let refresh = match body.get("refresh") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid("refresh must be a boolean")),
    };

    AnalysisRequest::parse(&keywords, time_bin, rolling, refresh)
}

// ============ POST /analyse ============

async fn handle_analyse(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Json(body) = body.map_err(|e| invalid(e.body_text()))?;
    let request = parse_request(&body)?;

    tracing::info!(
        keywords = ?request.keywords,
        granularity = %request.granularity,
        rolling = request.rolling,
        refresh = request.refresh,
        "analyse"
    );

    let (analysis, artifact) =
        run_analysis(&state.analyzer, &state.config.charts, &request).await?;

    Ok(Json(AnalysisResponse::new(analysis, &artifact)))
}

// ============ GET /keywords ============

#[derive(Serialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
}

async fn handle_keywords(State(state): State<AppState>) -> Json<KeywordsResponse> {
    Json(KeywordsResponse {
        keywords: state
            .analyzer
            .translator()
            .keywords()
            .map(str::to_string)
            .collect(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyword_trends_core::models::Granularity;
    use serde_json::json;

    #[test]
    fn test_parse_camel_case_body() {
        let req = parse_request(&json!({
            "keywords": "go, rust",
            "timeBin": "W",
            "rolling": "3",
            "refresh": true
        }))
        .unwrap();
        assert_eq!(req.keywords, vec!["go", "rust"]);
        assert_eq!(req.granularity, Granularity::Week);
        assert_eq!(req.rolling, 3);
        assert!(req.refresh);
    }

    #[test]
    fn test_parse_snake_case_and_defaults() {
        let req = parse_request(&json!({
            "keywords": ["python", "go"],
            "time_bin": "month",
            "rolling": 0
        }))
        .unwrap();
        assert_eq!(req.keywords, vec!["python", "go"]);
        assert_eq!(req.granularity, Granularity::Month);
        assert!(!req.refresh);
    }

    #[test]
    fn test_parse_errors_are_client_errors() {
        for body in [
            json!([]),
            json!({"timeBin": "D", "rolling": 0}),
            json!({"keywords": "go", "rolling": 0}),
            json!({"keywords": "go", "timeBin": "D"}),
            json!({"keywords": "go", "timeBin": "D", "rolling": "seven"}),
            json!({"keywords": "go", "timeBin": "hour", "rolling": 0}),
            json!({"keywords": " , ", "timeBin": "D", "rolling": 0}),
            json!({"keywords": "go", "timeBin": "D", "rolling": 0, "refresh": "yes"}),
        ] {
            let err = parse_request(&body).unwrap_err();
            assert!(err.is_client_error(), "{:?} -> {}", body, err);
        }
    }
}
