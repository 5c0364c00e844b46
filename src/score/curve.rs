//! Adaptive logistic transform.
//!
//! With calibration bounds `(low, high)` the curve is centered at their
//! midpoint and its steepness follows the spread:
//! `k = max(min_steepness, spread / (high - low))`.
//! Without usable bounds the fixed fallback center and steepness apply.
//! All constants are empirical and kept configurable.

use serde::{Deserialize, Serialize};

/// Beyond this exponent argument `exp` is treated as saturated.
const MAX_EXP_ARG: f64 = 700.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub fallback_center: f64,
    pub fallback_steepness: f64,
    pub spread: f64,
    pub min_steepness: f64,
    /// Lowest reportable score; zero reads as "broken" to end users.
    pub floor: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            fallback_center: 0.08,
            fallback_steepness: 16.0,
            spread: 8.0,
            min_steepness: 1.0,
            floor: 0.01,
        }
    }
}

/// Center and steepness actually used for one score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurveParams {
    pub center: f64,
    pub steepness: f64,
    /// False when the fallback constants were used.
    pub calibrated: bool,
}

impl CurveConfig {
    /// Replace any unusable constant with its default.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let finite = |v: f64, fb: f64| if v.is_finite() { v } else { fb };
        let positive = |v: f64, fb: f64| if v.is_finite() && v > 0.0 { v } else { fb };
        Self {
            fallback_center: finite(self.fallback_center, d.fallback_center),
            fallback_steepness: positive(self.fallback_steepness, d.fallback_steepness),
            spread: positive(self.spread, d.spread),
            min_steepness: positive(self.min_steepness, d.min_steepness),
            floor: if self.floor.is_finite() && (0.0..1.0).contains(&self.floor) {
                self.floor
            } else {
                d.floor
            },
        }
    }

    pub fn params(&self, bounds: Option<(f64, f64)>) -> CurveParams {
        match bounds {
            Some((low, high)) if low.is_finite() && high.is_finite() && high > low => {
                CurveParams {
                    center: (low + high) / 2.0,
                    steepness: self.min_steepness.max(self.spread / (high - low)),
                    calibrated: true,
                }
            }
            _ => CurveParams {
                center: self.fallback_center,
                steepness: self.fallback_steepness,
                calibrated: false,
            },
        }
    }

    /// Map a raw magnitude into `[floor, 1.0]`.
    pub fn apply(&self, raw: f64, p: &CurveParams) -> f64 {
        logistic(raw, p.center, p.steepness).clamp(self.floor, 1.0)
    }
}

/// `1 / (1 + e^(-k (x - x0)))`, saturating to 0.0 / 1.0 on extreme arguments.
pub fn logistic(x: f64, center: f64, steepness: f64) -> f64 {
    let arg = -steepness * (x - center);
    if arg.is_nan() || arg > MAX_EXP_ARG {
        0.0
    } else if arg < -MAX_EXP_ARG {
        1.0
    } else {
        1.0 / (1.0 + arg.exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_when_no_or_degenerate_bounds() {
        let c = CurveConfig::default();
        for b in [None, Some((0.3, 0.3)), Some((0.5, 0.2)), Some((f64::NAN, 1.0))] {
            let p = c.params(b);
            assert!(!p.calibrated);
            assert_eq!(p.center, 0.08);
            assert_eq!(p.steepness, 16.0);
        }
    }

    #[test]
    fn calibrated_center_and_steepness() {
        let c = CurveConfig::default();
        let p = c.params(Some((0.1, 0.5)));
        assert!(p.calibrated);
        assert!((p.center - 0.3).abs() < 1e-12);
        assert!((p.steepness - 20.0).abs() < 1e-9);

        // Wide spread flattens down to the minimum steepness.
        let wide = c.params(Some((0.0, 100.0)));
        assert_eq!(wide.steepness, 1.0);
    }

    #[test]
    fn logistic_saturates_instead_of_overflowing() {
        assert_eq!(logistic(1e9, 0.0, 16.0), 1.0);
        assert_eq!(logistic(-1e9, 0.0, 16.0), 0.0);
        assert_eq!(logistic(f64::NAN, 0.0, 16.0), 0.0);
        assert!((logistic(0.08, 0.08, 16.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn apply_respects_floor() {
        let c = CurveConfig::default();
        let p = c.params(None);
        assert_eq!(c.apply(-1e6, &p), 0.01);
        assert_eq!(c.apply(1e6, &p), 1.0);
    }
}
