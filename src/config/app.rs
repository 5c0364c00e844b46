// src/config/app.rs
//! Process configuration loaded from TOML with env overrides.
//!
//! ```toml
//! [paths]
//! weights = "config/weights.json"
//! history = "data/raw_history.json"
//! results = "data/results.jsonl"
//!
//! [calibration]
//! percentile_low = 5.0
//! percentile_high = 95.0
//! capacity = 500
//!
//! [curve]
//! fallback_center = 0.08
//! fallback_steepness = 16.0
//! spread = 8.0
//! min_steepness = 1.0
//! floor = 0.01
//!
//! [fixed]
//! alpha = 1.0
//! beta = 1.0
//! gamma = 1.0
//! delta = 1.0
//! eta = 1.0
//!
//! [intake]
//! min_chars = 10
//! max_chars = 2000
//! recent_capacity = 200
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::calibration::{
    store::DEFAULT_HISTORY_PATH, DEFAULT_CAPACITY, DEFAULT_PERCENTILE_HIGH, DEFAULT_PERCENTILE_LOW,
};
use crate::intake::IntakeLimits;
use crate::results::DEFAULT_RESULTS_PATH;
use crate::score::{weights::DEFAULT_WEIGHTS_PATH, CurveConfig, FixedExponents};

pub const DEFAULT_CONFIG_PATH: &str = "config/scorer.toml";

pub const ENV_CONFIG_PATH: &str = "IDEA_SCORER_CONFIG";
pub const ENV_WEIGHTS_PATH: &str = "IDEA_SCORER_WEIGHTS_PATH";
pub const ENV_HISTORY_PATH: &str = "IDEA_SCORER_HISTORY_PATH";
pub const ENV_RESULTS_PATH: &str = "IDEA_SCORER_RESULTS_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsSection,
    pub calibration: CalibrationSection,
    pub curve: CurveConfig,
    pub fixed: FixedExponents,
    pub intake: IntakeSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub weights: PathBuf,
    pub history: PathBuf,
    /// Empty string disables the JSONL mirror.
    pub results: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            weights: PathBuf::from(DEFAULT_WEIGHTS_PATH),
            history: PathBuf::from(DEFAULT_HISTORY_PATH),
            results: PathBuf::from(DEFAULT_RESULTS_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CalibrationSection {
    pub percentile_low: f64,
    pub percentile_high: f64,
    pub capacity: usize,
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            percentile_low: DEFAULT_PERCENTILE_LOW,
            percentile_high: DEFAULT_PERCENTILE_HIGH,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IntakeSection {
    pub min_chars: usize,
    pub max_chars: usize,
    pub recent_capacity: usize,
}

impl Default for IntakeSection {
    fn default() -> Self {
        let limits = IntakeLimits::default();
        Self {
            min_chars: limits.min_chars,
            max_chars: limits.max_chars,
            recent_capacity: 200,
        }
    }
}

impl IntakeSection {
    pub fn limits(&self) -> IntakeLimits {
        IntakeLimits {
            min_chars: self.min_chars,
            max_chars: self.max_chars,
        }
    }
}

impl AppConfig {
    /// Load from `$IDEA_SCORER_CONFIG` or "config/scorer.toml".
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no scorer config found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scorer config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing scorer config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// Clamp percentiles into [0,100] (swapping if inverted), keep capacity
    /// and length limits sane, and reset unusable curve/fixed constants.
    pub fn sanitized(mut self) -> Self {
        let c = &mut self.calibration;
        let fix = |p: f64, fallback: f64| {
            if p.is_finite() {
                p.clamp(0.0, 100.0)
            } else {
                fallback
            }
        };
        c.percentile_low = fix(c.percentile_low, DEFAULT_PERCENTILE_LOW);
        c.percentile_high = fix(c.percentile_high, DEFAULT_PERCENTILE_HIGH);
        if c.percentile_low > c.percentile_high {
            std::mem::swap(&mut c.percentile_low, &mut c.percentile_high);
        }
        c.capacity = c.capacity.max(1);

        self.curve = self.curve.sanitized();
        self.fixed = self.fixed.sanitized();

        let i = &mut self.intake;
        i.min_chars = i.min_chars.max(1);
        if i.max_chars < i.min_chars {
            i.max_chars = i.min_chars;
        }
        i.recent_capacity = i.recent_capacity.max(1);
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = std::env::var(ENV_WEIGHTS_PATH) {
            self.paths.weights = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(ENV_HISTORY_PATH) {
            self.paths.history = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(ENV_RESULTS_PATH) {
            self.paths.results = PathBuf::from(p);
        }
    }
}
