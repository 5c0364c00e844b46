//! RICE+ score engine.
//!
//! Two named modes share one magnitude formula:
//!
//! - **adaptive** (`compute_score`): Weight Vector exponents, logistic transform
//!   re-centered on percentile bounds of past raw magnitudes, percentage output.
//!   Every call feeds its raw magnitude back into the calibration store.
//! - **fixed-weight raw** (`fixed_weight_raw_score`): alpha..eta exponents, no
//!   sigmoid, no history; the magnitude rounded to 4 decimals.
//!
//! `raw = reach_n^a * impact^b * confidence^c / (effort^d * competition^e)`
//! with `reach_n = ln(1 + reach) / ln(100000)`.

pub mod curve;
pub mod inputs;
pub mod weights;

use std::sync::Arc;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{CalibrationStore, DEFAULT_PERCENTILE_HIGH, DEFAULT_PERCENTILE_LOW};

pub use curve::{CurveConfig, CurveParams};
pub use inputs::{RawParams, RiceInputs, REACH_MAX};
pub use weights::{FileWeights, FixedExponents, WeightSource, WeightVector};

/// Which of the two scoring operations produced a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Adaptive,
    Raw,
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Adaptive => "adaptive",
            ScoreMode::Raw => "raw",
        }
    }
}

/// Exponents for the five inputs, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Exponents {
    reach: f64,
    impact: f64,
    confidence: f64,
    effort: f64,
    competition: f64,
}

impl From<WeightVector> for Exponents {
    fn from(w: WeightVector) -> Self {
        Self {
            reach: 1.0,
            impact: w.impact,
            confidence: w.confidence,
            effort: w.effort,
            competition: w.competition,
        }
    }
}

impl From<FixedExponents> for Exponents {
    fn from(e: FixedExponents) -> Self {
        Self {
            reach: e.alpha,
            impact: e.beta,
            confidence: e.gamma,
            effort: e.delta,
            competition: e.eta,
        }
    }
}

/// Log-compressed reach in roughly `[0, 1]`.
pub fn normalized_reach(reach: u32) -> f64 {
    (1.0 + reach as f64).ln() / (REACH_MAX as f64).ln()
}

fn magnitude(i: &RiceInputs, e: Exponents) -> f64 {
    let num = normalized_reach(i.reach).powf(e.reach)
        * (i.impact as f64).powf(e.impact)
        * i.confidence.powf(e.confidence);
    // effort/competition floors are 1, so the denominator is >= 1.
    let den = (i.effort as f64).powf(e.effort) * (i.competition as f64).powf(e.competition);
    num / den
}

/// Adaptive-mode magnitude under the given Weight Vector.
pub fn raw_magnitude(inputs: &RiceInputs, w: &WeightVector) -> f64 {
    magnitude(inputs, (*w).into())
}

/// Fixed-weight magnitude, unrounded.
pub fn fixed_magnitude(inputs: &RiceInputs, e: &FixedExponents) -> f64 {
    magnitude(inputs, (*e).into())
}

/// Outcome of one adaptive score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdaptiveScore {
    pub inputs: RiceInputs,
    pub raw: f64,
    /// In `[floor, 1.0]`.
    pub value: f64,
    #[serde(flatten)]
    pub curve: CurveParams,
}

impl AdaptiveScore {
    /// "63.4%"
    pub fn display(&self) -> String {
        format_percent(self.value)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Pure adaptive score for explicit bounds. No side effects.
pub fn adaptive_score(
    inputs: RiceInputs,
    w: &WeightVector,
    bounds: Option<(f64, f64)>,
    curve: &CurveConfig,
) -> AdaptiveScore {
    let raw = raw_magnitude(&inputs, w);
    let params = curve.params(bounds);
    AdaptiveScore {
        inputs,
        raw,
        value: curve.apply(raw, &params),
        curve: params,
    }
}

/// The scoring component: weights source + calibration store + constants.
pub struct ScoreEngine {
    weights: Arc<dyn WeightSource>,
    store: Arc<dyn CalibrationStore>,
    curve: CurveConfig,
    fixed: FixedExponents,
    percentiles: (f64, f64),
}

impl ScoreEngine {
    pub fn new(weights: Arc<dyn WeightSource>, store: Arc<dyn CalibrationStore>) -> Self {
        Self {
            weights,
            store,
            curve: CurveConfig::default(),
            fixed: FixedExponents::default(),
            percentiles: (DEFAULT_PERCENTILE_LOW, DEFAULT_PERCENTILE_HIGH),
        }
    }

    pub fn with_curve(mut self, curve: CurveConfig) -> Self {
        self.curve = curve.sanitized();
        self
    }

    pub fn with_fixed_exponents(mut self, fixed: FixedExponents) -> Self {
        self.fixed = fixed.sanitized();
        self
    }

    pub fn with_percentiles(mut self, low: f64, high: f64) -> Self {
        self.percentiles = (low, high);
        self
    }

    pub fn store(&self) -> &Arc<dyn CalibrationStore> {
        &self.store
    }

    pub fn percentiles(&self) -> (f64, f64) {
        self.percentiles
    }

    /// Current calibration bounds at the configured percentiles.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.store.bounds(self.percentiles.0, self.percentiles.1)
    }

    /// Adaptive score with full detail. Records the raw magnitude afterwards.
    pub fn score_adaptive(&self, params: &RawParams) -> AdaptiveScore {
        let inputs = RiceInputs::sanitize(params);
        let w = self.weights.current();
        let bounds = self.bounds();
        let out = adaptive_score(inputs, &w, bounds, &self.curve);

        if !out.curve.calibrated {
            counter!("calibration_fallback_total").increment(1);
        }
        counter!("scores_computed_total", "mode" => "adaptive").increment(1);
        histogram!("score_raw_magnitude").record(out.raw);
        debug!(
            raw = out.raw,
            value = out.value,
            center = out.curve.center,
            steepness = out.curve.steepness,
            calibrated = out.curve.calibrated,
            "adaptive score"
        );

        self.store.record(out.raw);
        out
    }

    /// `score_adaptive` on tokio's blocking pool, for async callers: the
    /// weight and history files are read and written synchronously.
    pub async fn score_adaptive_blocking(self: Arc<Self>, params: RawParams) -> AdaptiveScore {
        match tokio::task::spawn_blocking(move || self.score_adaptive(&params)).await {
            Ok(s) => s,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Adaptive mode: percentage string with one decimal, e.g. "63.4%".
    pub fn compute_score(&self, params: &RawParams) -> String {
        self.score_adaptive(params).display()
    }

    /// Fixed-weight raw mode: `round(raw, 4)`, no sigmoid, no history.
    pub fn fixed_weight_raw_score(&self, params: &RawParams) -> f64 {
        let inputs = RiceInputs::sanitize(params);
        counter!("scores_computed_total", "mode" => "raw").increment(1);
        round4(fixed_magnitude(&inputs, &self.fixed))
    }
}
