//! OpenAI provider (Chat Completions API).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{parse_params_reply, sanitize_feedback, user_prompt, ParamExtractor};
use crate::intake::QaPair;
use crate::score::RawParams;

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const EXTRACT_SYSTEM: &str = "You estimate startup idea parameters. Reply with ONLY a JSON object with keys: \
reach (integer 0-100000, estimated monthly addressable users), impact (integer 1-5), \
confidence (number 0.0-1.0, two decimals), effort (integer 1-10, build cost), \
competition (integer 1-10, market saturation). No prose.";

const FEEDBACK_SYSTEM: &str = "You are a startup mentor. Given an idea and its desirability score, \
give 2-3 sentences of honest, constructive feedback. Plain text, no emojis, no lists.";

pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiExtractor {
    /// `model_override`: defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("idea-scorer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }

    async fn chat(&self, system: &str, user: &str, temperature: f32, max_tokens: u32) -> Option<String> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let resp = match self
            .http
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "openai request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "openai returned non-success status");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        body.choices.into_iter().next().map(|c| c.message.content)
    }
}

#[async_trait]
impl ParamExtractor for OpenAiExtractor {
    async fn extract(&self, idea: &str, answers: &[QaPair]) -> Option<RawParams> {
        let reply = self
            .chat(EXTRACT_SYSTEM, &user_prompt(idea, answers), 0.2, 120)
            .await?;
        let parsed = parse_params_reply(&reply);
        if parsed.is_none() {
            debug!(reply_len = reply.len(), "openai reply had no usable params");
        }
        parsed
    }

    async fn feedback(&self, idea: &str, score: &str) -> Option<String> {
        let user = format!("Idea: {idea}\nScore: {score}");
        let reply = self.chat(FEEDBACK_SYSTEM, &user, 0.4, 200).await?;
        let cleaned = sanitize_feedback(&reply);
        (!cleaned.is_empty()).then_some(cleaned)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
