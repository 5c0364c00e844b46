// src/intake.rs
//! Idea intake: validation of the submitted text, the fixed question list,
//! and mapping of answered questions into loose RICE+ params.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::score::RawParams;

pub const DEFAULT_MIN_CHARS: usize = 10;
pub const DEFAULT_MAX_CHARS: usize = 2000;

/// One question of a question flow together with the user's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// Field id for fixed questions ("reach", "impact", ...); free-form otherwise.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question: String,
    pub answer: String,
}

/// A fixed question, one per RICE+ field.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
}

pub const FIXED_QUESTIONS: [Question; 5] = [
    Question {
        id: "reach",
        text: "How many people per month face this problem? (0-100000)",
    },
    Question {
        id: "impact",
        text: "How strongly does the solution help them? (1-5)",
    },
    Question {
        id: "confidence",
        text: "How confident are you that it will work? (0.0-1.0)",
    },
    Question {
        id: "effort",
        text: "How hard is it to build? (1-10)",
    },
    Question {
        id: "competition",
        text: "How crowded is the market? (1-10)",
    },
];

/// Why an idea was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Empty,
    TooShort { min: usize },
    TooLong { max: usize },
}

impl Rejection {
    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            Rejection::Empty => "Please describe your idea in a few sentences.".to_string(),
            Rejection::TooShort { min } => {
                format!("The idea is too short. Please use at least {min} characters.")
            }
            Rejection::TooLong { max } => {
                format!("The idea is too long. Please keep it under {max} characters.")
            }
        }
    }
}

/// Length limits for submitted ideas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Trim and collapse whitespace, then enforce the length limits (in chars).
pub fn validate_idea(text: &str, limits: &IntakeLimits) -> Result<String, Rejection> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let n = cleaned.chars().count();
    if n == 0 {
        return Err(Rejection::Empty);
    }
    if n < limits.min_chars {
        return Err(Rejection::TooShort {
            min: limits.min_chars,
        });
    }
    if n > limits.max_chars {
        return Err(Rejection::TooLong {
            max: limits.max_chars,
        });
    }
    Ok(cleaned)
}

/// Map answers to fixed questions onto params.
///
/// Returns the params and whether all five fields were answered. Answers are
/// kept as strings; sanitization happens in the score engine.
pub fn params_from_answers(answers: &[QaPair]) -> (RawParams, bool) {
    let mut p = RawParams::default();
    for qa in answers {
        let Some(id) = qa.id.as_deref() else { continue };
        let slot = match id.trim().to_ascii_lowercase().as_str() {
            "reach" => &mut p.reach,
            "impact" => &mut p.impact,
            "confidence" => &mut p.confidence,
            "effort" => &mut p.effort,
            "competition" => &mut p.competition,
            _ => continue,
        };
        *slot = Value::String(qa.answer.trim().to_string());
    }
    let complete = [&p.reach, &p.impact, &p.confidence, &p.effort, &p.competition]
        .iter()
        .all(|v| !v.is_null());
    (p, complete)
}

/// Short anonymized id for logs (first 6 bytes of SHA-256, hex).
pub fn idea_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
