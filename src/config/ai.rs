// src/config/ai.rs
use serde::{Deserialize, Serialize};

use crate::ai_adapter::ModelParams;

pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz";
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";

fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Never logged; only its length is.
    #[serde(skip_serializing, default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Upper bound of concurrent batch calls.
    pub concurrency: usize,
    /// "mock" selects the deterministic echo client.
    pub test_mode: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: 60,
            concurrency: 2,
            test_mode: None,
        }
    }
}

impl LlmConfig {
    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.test_mode.as_deref() == Some("mock")
    }

    /// Clamp values the provider would reject.
    pub fn sanitize(&mut self) {
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        self.concurrency = self.concurrency.max(1);
        self.timeout_secs = self.timeout_secs.max(1);
        self.test_mode = self
            .test_mode
            .take()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_restores_defaults() {
        let mut cfg = LlmConfig {
            temperature: 7.5,
            max_tokens: 0,
            concurrency: 0,
            timeout_secs: 0,
            test_mode: Some(" MOCK ".into()),
            ..LlmConfig::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.temperature, 0.3);
        assert_eq!(cfg.max_tokens, 2048);
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.timeout_secs, 1);
        assert!(cfg.is_mock());
    }

    #[test]
    fn api_key_is_not_serialized() {
        let cfg = LlmConfig {
            api_key: "secret".into(),
            ..LlmConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }
}
