//! RICE+ inputs and their sanitization.
//!
//! Upstream sources (question flows, model inference) hand us loosely typed
//! values. `RawParams` keeps them as raw JSON values; `RiceInputs::sanitize`
//! coerces every field to its numeric type and clamps it into its domain.
//! Anything that cannot be coerced falls back to the field's neutral default,
//! so sanitization never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound of the reach domain (estimated monthly addressable users).
pub const REACH_MAX: u32 = 100_000;

pub const DEFAULT_REACH: u32 = 0;
pub const DEFAULT_IMPACT: u8 = 3;
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_EFFORT: u8 = 5;
pub const DEFAULT_COMPETITION: u8 = 5;

/// Loosely typed payload as produced by the parameter extraction service.
///
/// Missing keys deserialize to `null` and are treated like any other
/// non-numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawParams {
    #[serde(default, alias = "Reach")]
    pub reach: Value,
    #[serde(default, alias = "Impact")]
    pub impact: Value,
    #[serde(default, alias = "Confidence")]
    pub confidence: Value,
    #[serde(default, alias = "Effort")]
    pub effort: Value,
    #[serde(default, alias = "Competition")]
    pub competition: Value,
}

impl RawParams {
    pub fn new(
        reach: impl Into<Value>,
        impact: impl Into<Value>,
        confidence: impl Into<Value>,
        effort: impl Into<Value>,
        competition: impl Into<Value>,
    ) -> Self {
        Self {
            reach: reach.into(),
            impact: impact.into(),
            confidence: confidence.into(),
            effort: effort.into(),
            competition: competition.into(),
        }
    }

    /// True when no field carries anything at all.
    pub fn is_empty(&self) -> bool {
        [
            &self.reach,
            &self.impact,
            &self.confidence,
            &self.effort,
            &self.competition,
        ]
        .iter()
        .all(|v| v.is_null())
    }
}

/// Sanitized RICE+ input vector. Every field lies inside its domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiceInputs {
    /// 0 ..= 100000
    pub reach: u32,
    /// 1 ..= 5
    pub impact: u8,
    /// 0.0 ..= 1.0, two decimals
    pub confidence: f64,
    /// 1 ..= 10
    pub effort: u8,
    /// 1 ..= 10
    pub competition: u8,
}

impl Default for RiceInputs {
    fn default() -> Self {
        Self {
            reach: DEFAULT_REACH,
            impact: DEFAULT_IMPACT,
            confidence: DEFAULT_CONFIDENCE,
            effort: DEFAULT_EFFORT,
            competition: DEFAULT_COMPETITION,
        }
    }
}

impl RiceInputs {
    /// Build from already numeric values, clamping each into its domain.
    pub fn new(reach: i64, impact: i64, confidence: f64, effort: i64, competition: i64) -> Self {
        Self {
            reach: reach.clamp(0, REACH_MAX as i64) as u32,
            impact: impact.clamp(1, 5) as u8,
            confidence: round2(if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                DEFAULT_CONFIDENCE
            }),
            effort: effort.clamp(1, 10) as u8,
            competition: competition.clamp(1, 10) as u8,
        }
    }

    /// Coerce a loose payload. Never fails.
    pub fn sanitize(raw: &RawParams) -> Self {
        Self::new(
            coerce_int(&raw.reach).unwrap_or(DEFAULT_REACH as i64),
            coerce_int(&raw.impact).unwrap_or(DEFAULT_IMPACT as i64),
            coerce_real(&raw.confidence).unwrap_or(DEFAULT_CONFIDENCE),
            coerce_int(&raw.effort).unwrap_or(DEFAULT_EFFORT as i64),
            coerce_int(&raw.competition).unwrap_or(DEFAULT_COMPETITION as i64),
        )
    }
}

/// Numbers pass through, numeric strings are parsed; everything else
/// (null, bool, arrays, objects, non-finite) yields `None`.
fn coerce_real(v: &Value) -> Option<f64> {
    let x = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

/// Integer fields truncate toward zero, then saturate into `i64`.
fn coerce_int(v: &Value) -> Option<i64> {
    if let Value::Number(n) = v {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    coerce_real(v).map(|x| x.trunc() as i64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn garbage_falls_back_to_defaults() {
        let raw = RawParams::new(json!(null), json!(true), json!([1]), json!({}), json!("abc"));
        assert_eq!(RiceInputs::sanitize(&raw), RiceInputs::default());
    }

    #[test]
    fn out_of_range_is_clamped() {
        let raw = RawParams::new(250_000, 999, -5, 0, -3);
        let s = RiceInputs::sanitize(&raw);
        assert_eq!(s.reach, REACH_MAX);
        assert_eq!(s.impact, 5);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.effort, 1);
        assert_eq!(s.competition, 1);
    }

    #[test]
    fn numeric_strings_are_parsed_and_truncated() {
        let raw = RawParams::new(" 1200 ", "4.9", "0.756", "7", 2.9);
        let s = RiceInputs::sanitize(&raw);
        assert_eq!(s.reach, 1200);
        assert_eq!(s.impact, 4);
        assert!((s.confidence - 0.76).abs() < 1e-12);
        assert_eq!(s.effort, 7);
        assert_eq!(s.competition, 2);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        let raw = RawParams::new("inf", "NaN", "-inf", "1e400", "5");
        let s = RiceInputs::sanitize(&raw);
        assert_eq!(s.reach, DEFAULT_REACH);
        assert_eq!(s.impact, DEFAULT_IMPACT);
        assert_eq!(s.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(s.effort, DEFAULT_EFFORT);
    }

    #[test]
    fn capitalized_keys_are_accepted() {
        let raw: RawParams =
            serde_json::from_str(r#"{"Reach": 10, "Impact": 2, "confidence": 0.3}"#).unwrap();
        let s = RiceInputs::sanitize(&raw);
        assert_eq!((s.reach, s.impact), (10, 2));
        assert_eq!(s.effort, DEFAULT_EFFORT);
        assert!(!raw.is_empty());
        assert!(RawParams::default().is_empty());
    }
}
