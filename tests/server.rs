//! HTTP server tests against an in-memory corpus.
//!
//! Each test starts a server on a free port, waits for `/health`, then
//! drives it with reqwest.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use keyword_trends::config::Config;
use keyword_trends::server::run_server_with_corpus;
use keyword_trends_core::query::QueryTranslator;
use keyword_trends_core::store::memory::InMemoryCorpus;
use serde_json::{json, Value};
use tempfile::TempDir;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(base: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{}/health", base)).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("server at {} did not become ready", base);
}

fn weeks(n: i64) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
    (0..n).map(|i| start + chrono::Duration::weeks(i)).collect()
}

/// Start a server over a small corpus; returns the base URL.
async fn start_server(tmp: &TempDir) -> String {
    let port = find_free_port();
    let mut config = Config::minimal();
    config.server.bind = format!("127.0.0.1:{}", port);
    config.cache.dir = tmp.path().join("cache");
    config.charts.dir = tmp.path().join("images");

    let translator = QueryTranslator::with_defaults();
    let corpus = InMemoryCorpus::new()
        .with_items(weeks(12))
        .with_items(weeks(12))
        .with_matches(translator.resolve("python").as_str(), weeks(12));

    tokio::spawn(async move {
        if let Err(e) = run_server_with_corpus(&config, Arc::new(corpus)).await {
            eprintln!("server exited: {:#}", e);
        }
    });

    let base = format!("http://127.0.0.1:{}", port);
    wait_for_server(&base).await;
    base
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_analyse_returns_results_and_serves_chart() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/analyse", base))
        .json(&json!({
            "keywords": "python, zzzznomatch",
            "timeBin": "W",
            "rolling": "2",
            "refresh": false
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["results"][0]["keyword"], "python");
    assert_eq!(body["results"][0]["status"], "success");
    assert_eq!(body["results"][0]["points"], 12);
    assert_eq!(body["results"][1]["status"], "no_data");
    assert!(body["results"][1].get("points").is_none());

    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("/static/images/plot_"));
    assert!(image.ends_with(".svg"));

    let chart = client
        .get(format!("{}{}", base, image))
        .send()
        .await
        .unwrap();
    assert_eq!(chart.status(), 200);
    let svg = chart.text().await.unwrap();
    assert!(svg.contains("<svg"));
}

#[tokio::test]
async fn test_invalid_requests_are_400() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    for body in [
        json!({"timeBin": "D", "rolling": 0}),
        json!({"keywords": "python", "timeBin": "hourly", "rolling": 0}),
        json!({"keywords": " , ", "timeBin": "D", "rolling": 0}),
    ] {
        let resp = client
            .post(format!("{}/analyse", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body: {}", body);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["success"], false);
        assert!(err["error"].as_str().unwrap().contains("invalid request"));
    }

    let resp = client
        .post(format!("{}/analyse", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["success"], false);
}

#[tokio::test]
async fn test_keywords_lists_curated_table() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("{}/keywords", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let keywords: Vec<&str> = body["keywords"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(keywords.len(), 27);
    assert!(keywords.contains(&"rust"));
    assert!(keywords.contains(&"go"));
}
