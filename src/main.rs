//! Idea Scorer: binary entrypoint.
//! Boots the Axum HTTP server, wiring config, calibration store, extractor and routes.

use idea_scorer::{
    api::{create_router, AppState},
    config::{ai::DEFAULT_AI_CONFIG_PATH, AiConfig, AppConfig},
    init_tracing,
    metrics::Metrics,
};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load()?;
    let ai = AiConfig::load_or_disabled(DEFAULT_AI_CONFIG_PATH);
    info!(
        history = %cfg.paths.history.display(),
        weights = %cfg.paths.weights.display(),
        capacity = cfg.calibration.capacity,
        ai_enabled = ai.enabled,
        provider = %ai.provider,
        "idea scorer starting"
    );

    let state = AppState::from_config(&cfg, &ai);
    let mut router = create_router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    Ok(router.into())
}
