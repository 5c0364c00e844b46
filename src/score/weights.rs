//! Weight exponents for both scoring modes.
//!
//! Adaptive mode uses the Weight Vector from `config/weights.json`:
//! {
//!   "I": 1.2236,
//!   "C": 0.6004,
//!   "E": 0.6069,
//!   "K": 1.7795
//! }
//!
//! The file is read on every `current()` call, so an external recalibration
//! takes effect on the next score without a restart. Absent, malformed or
//! partial files fall back to the whole built-in vector (no partial merge).
//!
//! Fixed-weight mode uses `FixedExponents` (alpha..eta) from the app config.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_WEIGHTS_PATH: &str = "config/weights.json";

/// Exponents applied to impact, confidence, effort and competition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    #[serde(rename = "I")]
    pub impact: f64,
    #[serde(rename = "C")]
    pub confidence: f64,
    #[serde(rename = "E")]
    pub effort: f64,
    #[serde(rename = "K")]
    pub competition: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            impact: 1.2236,
            confidence: 0.6004,
            effort: 0.6069,
            competition: 1.7795,
        }
    }
}

impl WeightVector {
    /// All four exponents must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.impact, self.confidence, self.effort, self.competition]
            .iter()
            .all(|w| w.is_finite() && *w > 0.0)
    }
}

/// Anything that can hand out the Weight Vector for one scoring call.
pub trait WeightSource: Send + Sync {
    fn current(&self) -> WeightVector;
}

/// A fixed vector never changes; handy for tests and embedded use.
impl WeightSource for WeightVector {
    fn current(&self) -> WeightVector {
        *self
    }
}

/// Reads the weight file fresh on each call.
#[derive(Debug, Clone)]
pub struct FileWeights {
    path: PathBuf,
}

impl FileWeights {
    /// Create with a path (defaults to "config/weights.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS_PATH));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WeightSource for FileWeights {
    fn current(&self) -> WeightVector {
        match load_weights_file(&self.path) {
            Ok(w) => w,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "weights fallback to defaults");
                counter!("weights_fallback_total").increment(1);
                WeightVector::default()
            }
        }
    }
}

/// Load weights directly (no caching). Public for tests/tools.
pub fn load_weights_file(path: &Path) -> io::Result<WeightVector> {
    let bytes = fs::read(path)?;
    let w: WeightVector = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if !w.is_valid() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "weight exponents must be finite and positive",
        ));
    }
    Ok(w)
}

/// Exponents of the fixed-weight raw score:
/// `reach^alpha * impact^beta * confidence^gamma / (effort^delta * competition^eta)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedExponents {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub eta: f64,
}

impl Default for FixedExponents {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            gamma: 1.0,
            delta: 1.0,
            eta: 1.0,
        }
    }
}

impl FixedExponents {
    /// Replace any non-finite or non-positive exponent with its default.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let pick = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        Self {
            alpha: pick(self.alpha, d.alpha),
            beta: pick(self.beta, d.beta),
            gamma: pick(self.gamma, d.gamma),
            delta: pick(self.delta, d.delta),
            eta: pick(self.eta, d.eta),
        }
    }
}
