use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::calibration::{CalibrationStore, FileStore};
use crate::config::{AiConfig, AppConfig};
use crate::extract::{build_extractor, DynExtractor};
use crate::pipeline::{IdeaPipeline, IdeaRequest, Outcome};
use crate::results::{ResultLog, ScoredIdea};
use crate::score::{AdaptiveScore, FileWeights, RawParams, ScoreEngine};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoreEngine>,
    pub pipeline: Arc<IdeaPipeline>,
    pub results: Arc<ResultLog>,
}

impl AppState {
    /// Wire engine, store, result log and extractor from config.
    pub fn from_config(cfg: &AppConfig, ai: &AiConfig) -> Self {
        let store: Arc<dyn CalibrationStore> = Arc::new(FileStore::new(
            cfg.paths.history.clone(),
            cfg.calibration.capacity,
        ));
        Self::with_parts(cfg, store, build_extractor(ai), ai.feedback)
    }

    /// Same wiring with explicit store and extractor (tests, embedding).
    pub fn with_parts(
        cfg: &AppConfig,
        store: Arc<dyn CalibrationStore>,
        extractor: DynExtractor,
        feedback: bool,
    ) -> Self {
        let weights = Arc::new(FileWeights::new(Some(cfg.paths.weights.as_path())));
        let engine = Arc::new(
            ScoreEngine::new(weights, store)
                .with_curve(cfg.curve)
                .with_fixed_exponents(cfg.fixed)
                .with_percentiles(
                    cfg.calibration.percentile_low,
                    cfg.calibration.percentile_high,
                ),
        );

        let mut results = ResultLog::with_capacity(cfg.intake.recent_capacity);
        if !cfg.paths.results.as_os_str().is_empty() {
            results = results.with_file(cfg.paths.results.clone());
        }
        let results = Arc::new(results);

        let pipeline = Arc::new(
            IdeaPipeline::new(engine.clone(), extractor, results.clone())
                .with_limits(cfg.intake.limits())
                .with_feedback(feedback),
        );

        Self {
            engine,
            pipeline,
            results,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/score", post(score_adaptive))
        .route("/score/raw", post(score_raw))
        .route("/ideas", post(submit_idea))
        .route("/calibration", get(calibration_info))
        .route("/debug/recent", get(debug_recent))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias kept short for callers: `idea_scorer::router(state)`.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

#[derive(Serialize)]
struct ScoreResp {
    score: String,
    #[serde(flatten)]
    detail: AdaptiveScore,
}

async fn score_adaptive(State(state): State<AppState>, Json(body): Json<RawParams>) -> Json<ScoreResp> {
    let detail = state.engine.score_adaptive_blocking(body).await;
    Json(ScoreResp {
        score: detail.display(),
        detail,
    })
}

#[derive(Serialize)]
struct RawScoreResp {
    score: f64,
}

async fn score_raw(State(state): State<AppState>, Json(body): Json<RawParams>) -> Json<RawScoreResp> {
    Json(RawScoreResp {
        score: state.engine.fixed_weight_raw_score(&body),
    })
}

async fn submit_idea(State(state): State<AppState>, Json(req): Json<IdeaRequest>) -> Json<Outcome> {
    Json(state.pipeline.run(&req).await)
}

#[derive(Serialize)]
struct BoundsOut {
    low: f64,
    high: f64,
}

#[derive(Serialize)]
struct CalibrationOut {
    entries: usize,
    percentile_low: f64,
    percentile_high: f64,
    bounds: Option<BoundsOut>,
}

async fn calibration_info(State(state): State<AppState>) -> Json<CalibrationOut> {
    let (p_low, p_high) = state.engine.percentiles();
    let store = state.engine.store().clone();
    let history = tokio::task::spawn_blocking(move || store.history())
        .await
        .unwrap_or_default();
    let bounds = crate::calibration::percentile_bounds(&history, p_low, p_high)
        .map(|(low, high)| BoundsOut { low, high });
    Json(CalibrationOut {
        entries: history.len(),
        percentile_low: p_low,
        percentile_high: p_high,
        bounds,
    })
}

async fn debug_recent(State(state): State<AppState>) -> Json<Vec<ScoredIdea>> {
    Json(state.results.snapshot_last_n(10))
}
