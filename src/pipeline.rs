//! # Idea pipeline
//! validate → obtain params (answers or model) → score → log result → feedback.
//!
//! The pipeline never fails: every path ends in an `Outcome` that can be
//! rendered back to the user.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::extract::DynExtractor;
use crate::intake::{idea_id, params_from_answers, validate_idea, IntakeLimits, QaPair, Rejection};
use crate::results::{ResultLog, ScoredIdea};
use crate::score::{RiceInputs, ScoreEngine, ScoreMode};

/// User-visible message when the model gave nothing usable.
pub const MODEL_UNAVAILABLE_MSG: &str = "Could not get a response from the model. Please try again later.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdeaRequest {
    pub idea: String,
    #[serde(default)]
    pub answers: Vec<QaPair>,
    #[serde(default)]
    pub mode: ScoreMode,
}

impl IdeaRequest {
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Scored {
        result: ScoredIdea,
        /// Adaptive mode only.
        #[serde(skip_serializing_if = "Option::is_none")]
        calibrated: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    Rejected {
        reason: Rejection,
        message: String,
    },
    ModelUnavailable {
        message: String,
    },
}

pub struct IdeaPipeline {
    engine: Arc<ScoreEngine>,
    extractor: DynExtractor,
    results: Arc<ResultLog>,
    limits: IntakeLimits,
    feedback: bool,
}

impl IdeaPipeline {
    pub fn new(engine: Arc<ScoreEngine>, extractor: DynExtractor, results: Arc<ResultLog>) -> Self {
        Self {
            engine,
            extractor,
            results,
            limits: IntakeLimits::default(),
            feedback: false,
        }
    }

    pub fn with_limits(mut self, limits: IntakeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Ask the extractor for feedback after scoring.
    pub fn with_feedback(mut self, on: bool) -> Self {
        self.feedback = on;
        self
    }

    pub async fn run(&self, req: &IdeaRequest) -> Outcome {
        let idea = match validate_idea(&req.idea, &self.limits) {
            Ok(t) => t,
            Err(reason) => {
                counter!("ideas_rejected_total").increment(1);
                return Outcome::Rejected {
                    message: reason.message(),
                    reason,
                };
            }
        };
        let id = idea_id(&idea);

        // All five fixed questions answered: no model call needed.
        let (direct, complete) = params_from_answers(&req.answers);
        let (params, provider) = if complete {
            (direct, "answers")
        } else {
            match self.extractor.extract(&idea, &req.answers).await {
                Some(p) => (p, self.extractor.provider_name()),
                None => {
                    warn!(%id, provider = self.extractor.provider_name(), "parameter extraction failed");
                    counter!("extraction_failures_total").increment(1);
                    return Outcome::ModelUnavailable {
                        message: MODEL_UNAVAILABLE_MSG.to_string(),
                    };
                }
            }
        };

        let (inputs, raw, score, calibrated) = match req.mode {
            ScoreMode::Adaptive => {
                let s = self.engine.clone().score_adaptive_blocking(params).await;
                (s.inputs, s.raw, s.display(), Some(s.curve.calibrated))
            }
            ScoreMode::Raw => {
                let raw = self.engine.fixed_weight_raw_score(&params);
                (RiceInputs::sanitize(&params), raw, format!("{raw:.4}"), None)
            }
        };
        info!(%id, mode = req.mode.as_str(), %score, provider, "idea scored");

        let feedback = if self.feedback {
            self.extractor.feedback(&idea, &score).await
        } else {
            None
        };

        let result = ScoredIdea {
            ts: Utc::now(),
            idea_id: id,
            idea,
            inputs,
            raw,
            score,
            mode: req.mode,
            provider: provider.to_string(),
        };
        self.results.push(result.clone());

        Outcome::Scored {
            result,
            calibrated,
            feedback,
        }
    }
}

/// Chat reply in HTML parse mode; all user/model text is escaped.
pub fn render_chat_reply(outcome: &Outcome) -> String {
    use html_escape::encode_text;
    match outcome {
        Outcome::Scored {
            result, feedback, ..
        } => {
            let i = &result.inputs;
            let mut out = format!(
                "<b>📊 Idea score:</b> {}\n\n\
                 <i>Reach</i>: {}\n<i>Impact</i>: {}\n<i>Confidence</i>: {:.2}\n\
                 <i>Effort</i>: {}\n<i>Competition</i>: {}",
                encode_text(&result.score),
                i.reach,
                i.impact,
                i.confidence,
                i.effort,
                i.competition
            );
            if let Some(fb) = feedback {
                out.push_str("\n\n<b>Feedback:</b> ");
                out.push_str(&encode_text(fb));
            }
            out
        }
        Outcome::Rejected { message, .. } | Outcome::ModelUnavailable { message } => {
            format!("⚠️ {}", encode_text(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_escapes_feedback() {
        let outcome = Outcome::Scored {
            result: ScoredIdea {
                ts: Utc::now(),
                idea_id: "abc".into(),
                idea: "x".into(),
                inputs: RiceInputs::default(),
                raw: 0.1,
                score: "63.4%".into(),
                mode: ScoreMode::Adaptive,
                provider: "mock".into(),
            },
            calibrated: Some(false),
            feedback: Some("Use <b>tags</b> & more".into()),
        };
        let html = render_chat_reply(&outcome);
        assert!(html.contains("63.4%"));
        assert!(html.contains("&lt;b&gt;tags&lt;/b&gt; &amp; more"));
        assert!(html.contains("<i>Confidence</i>: 0.50"));
    }

    #[test]
    fn chat_reply_for_failures() {
        let html = render_chat_reply(&Outcome::ModelUnavailable {
            message: MODEL_UNAVAILABLE_MSG.into(),
        });
        assert!(html.starts_with("⚠️ Could not get a response"));
    }
}
