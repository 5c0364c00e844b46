//! Parameter extraction: the language-model collaborator that turns idea text
//! (plus optional question/answer pairs) into five loosely typed RICE+ fields,
//! and optionally writes short qualitative feedback.
//!
//! Nothing returned from here is trusted; the score engine sanitizes it.

pub mod cache;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::AiConfig;
use crate::intake::QaPair;
use crate::score::RawParams;

pub use cache::CachedExtractor;
pub use openai::OpenAiExtractor;

/// Max length of feedback text returned to users.
pub const FEEDBACK_MAX_CHARS: usize = 600;

#[async_trait]
pub trait ParamExtractor: Send + Sync {
    /// `None` when no usable answer could be obtained.
    async fn extract(&self, idea: &str, answers: &[QaPair]) -> Option<RawParams>;

    /// Short qualitative feedback for an already scored idea.
    async fn feedback(&self, _idea: &str, _score: &str) -> Option<String> {
        None
    }

    /// Provider name for diagnostics/logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynExtractor = Arc<dyn ParamExtractor>;

/// Factory: build an extractor according to config and environment.
///
/// * `AI_TEST_MODE=mock` → deterministic mock.
/// * disabled config → `DisabledExtractor`.
/// * "openai" → OpenAI wrapped with file cache + daily limit.
pub fn build_extractor(cfg: &AiConfig) -> DynExtractor {
    let forced_mock = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if forced_mock || (cfg.enabled && cfg.provider == "mock") {
        info!("parameter extraction: mock provider");
        return Arc::new(MockExtractor::default());
    }
    if !cfg.enabled {
        info!("parameter extraction disabled");
        return Arc::new(DisabledExtractor);
    }
    match cfg.provider.as_str() {
        "openai" => {
            let provider = OpenAiExtractor::new(cfg.api_key.clone(), Some(&cfg.model));
            Arc::new(CachedExtractor::new(
                provider,
                cache::default_cache_dir(),
                cfg.daily_limit,
            ))
        }
        _ => Arc::new(DisabledExtractor),
    }
}

/// Always `None`; used when AI is disabled.
pub struct DisabledExtractor;

#[async_trait]
impl ParamExtractor for DisabledExtractor {
    async fn extract(&self, _idea: &str, _answers: &[QaPair]) -> Option<RawParams> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed params and feedback for tests/local runs.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    pub params: RawParams,
    pub feedback: Option<String>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self {
            params: RawParams::new(5000, 4, 0.7, 3, 2),
            feedback: Some("Clear problem; validate demand with a landing page first (mock).".into()),
        }
    }
}

#[async_trait]
impl ParamExtractor for MockExtractor {
    async fn extract(&self, _idea: &str, _answers: &[QaPair]) -> Option<RawParams> {
        Some(self.params.clone())
    }
    async fn feedback(&self, _idea: &str, _score: &str) -> Option<String> {
        self.feedback.clone()
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// First JSON object in a model reply that carries at least one field.
///
/// Each `{` is tried as a start; the stream deserializer stops at the end of
/// that object, so code fences, prose and stray braces around it are ignored.
pub fn parse_params_reply(reply: &str) -> Option<RawParams> {
    reply.match_indices('{').find_map(|(start, _)| {
        let mut stream =
            serde_json::Deserializer::from_str(&reply[start..]).into_iter::<RawParams>();
        match stream.next() {
            Some(Ok(params)) if !params.is_empty() => Some(params),
            _ => None,
        }
    })
}

/// Idea text plus answered questions, as sent to the model.
pub fn user_prompt(idea: &str, answers: &[QaPair]) -> String {
    let mut out = format!("Idea: {idea}");
    for qa in answers.iter().filter(|qa| !qa.answer.trim().is_empty()) {
        let q = if qa.question.trim().is_empty() {
            qa.id.as_deref().unwrap_or("question")
        } else {
            qa.question.trim()
        };
        out.push_str(&format!("\nQ: {q}\nA: {}", qa.answer.trim()));
    }
    out
}

/// Single line, collapsed whitespace, at most `FEEDBACK_MAX_CHARS` chars.
pub fn sanitize_feedback(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(FEEDBACK_MAX_CHARS).collect::<String>().trim().to_string()
}
