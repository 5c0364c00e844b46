// src/lib.rs
// Public library surface for integration tests and the binaries.

pub mod api;
pub mod calibration;
pub mod config;
pub mod extract;
pub mod intake;
pub mod metrics;
pub mod pipeline;
pub mod results;
pub mod score;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::calibration::{CalibrationStore, FileStore, MemoryStore};
pub use crate::pipeline::{IdeaPipeline, IdeaRequest, Outcome};
pub use crate::score::{RawParams, RiceInputs, ScoreEngine, ScoreMode, WeightVector};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default `idea_scorer=info,warn`);
/// `IDEA_SCORER_LOG_JSON=1` switches to JSON lines. If a subscriber is
/// already installed (e.g. by the hosting runtime) it is left in place.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("idea_scorer=info,warn"));
    let json = std::env::var("IDEA_SCORER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
