// tests/metrics.rs
//
// The Prometheus recorder is process-global, so this file holds one test.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use idea_scorer::api::{self, AppState};
use idea_scorer::calibration::MemoryStore;
use idea_scorer::config::AppConfig;
use idea_scorer::extract::MockExtractor;
use idea_scorer::metrics::Metrics;

#[tokio::test]
async fn metrics_endpoint_contains_scoring_series() {
    let metrics = Metrics::init().expect("install recorder");

    let mut cfg = AppConfig::default();
    cfg.paths.results = PathBuf::new();
    let state = AppState::with_parts(
        &cfg,
        Arc::new(MemoryStore::default()),
        Arc::new(MockExtractor::default()),
        false,
    );
    let app = api::router(state).merge(metrics.router());

    let score = Request::post("/score")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"reach":5000,"impact":4,"confidence":0.7,"effort":3,"competition":2}"#,
        ))
        .unwrap();
    let resp = app.clone().oneshot(score).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let raw = Request::post("/score/raw")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"reach":10}"#))
        .unwrap();
    let resp = app.clone().oneshot(raw).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "scores_computed_total{mode=\"adaptive\"} 1",
        "scores_computed_total{mode=\"raw\"} 1",
        "calibration_fallback_total 1",
        "score_raw_magnitude",
    ] {
        assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
    }
}
