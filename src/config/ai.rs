// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};
use tracing::warn;

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_daily_limit() -> u32 {
    20
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" | "mock" (case-insensitive)
    #[serde(default)]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Real provider calls per day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Ask the model for qualitative feedback after scoring.
    #[serde(default)]
    pub feedback: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: String::new(),
            model: default_model(),
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
            feedback: false,
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.resolved()
    }

    /// Like `load_from_file`, but any failure yields a disabled config.
    pub fn load_or_disabled<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "AI config unusable, AI disabled");
                }
                Self::default()
            }
        }
    }

    /// Normalize provider and resolve the "ENV" key placeholder.
    pub fn resolved(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" if self.enabled => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                "openai" | "mock" | "" => String::new(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
        Ok(self)
    }
}
