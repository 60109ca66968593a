//! AI adapter: provider abstraction for the summarization calls.
//!
//! The summarizer only sees `AiClient`: text in, text out. Concrete providers
//! are an OpenAI-compatible chat-completions client, a disabled client and a
//! deterministic echo mock for tests and offline runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ai::LlmConfig;
use crate::errors::ModelCallError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Model parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One summarization request (one batch).
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub system: String,
    pub user: String,
    pub params: ModelParams,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelCallError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynAiClient = Arc<dyn AiClient>;

/// Factory: build a client according to config.
///
/// * `test_mode == Some("mock")` returns the deterministic echo client.
/// * A missing API key returns a disabled client.
/// * Otherwise the OpenAI-compatible provider.
pub fn build_client_from_config(config: &LlmConfig) -> anyhow::Result<DynAiClient> {
    if config.test_mode.as_deref() == Some("mock") {
        return Ok(Arc::new(EchoMockClient));
    }
    if config.api_key.is_empty() {
        return Ok(Arc::new(DisabledClient));
    }
    let provider = OpenAiCompatProvider::new(
        &config.base_url,
        &config.api_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Chat Completions client (OpenAI, Together AI and compatible gateways).
pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("subreddit-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        })
    }
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
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AiClient for OpenAiCompatProvider {
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelCallError> {
        let req = Req {
            model: &request.params.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &request.system,
                },
                Msg {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            return Err(ModelCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ModelCallError::EmptyResponse);
        }
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}

/// Always fails with `Disabled`; used when no API key is configured.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn complete(&self, _request: &PromptRequest) -> Result<String, ModelCallError> {
        Err(ModelCallError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic mock: emits one well-formed record per post found in the prompt.
pub struct EchoMockClient;

#[async_trait]
impl AiClient for EchoMockClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelCallError> {
        let mut records = Vec::new();
        let mut title = None;
        for line in request.user.lines() {
            let line = line.trim();
            if let Some(t) = line.strip_prefix("Title:") {
                title = Some(t.trim().to_string());
            } else if let Some(u) = line.strip_prefix("URL:") {
                let t = title.take().unwrap_or_else(|| "Untitled".to_string());
                records.push(format!(
                    "Title: {t}\nCategory: General\nSummary: Mock summary of \"{t}\".\nSource: {}\nRelevance: 0.5",
                    u.trim()
                ));
            }
        }
        if records.is_empty() {
            return Err(ModelCallError::EmptyResponse);
        }
        Ok(records.join("\n---\n"))
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> PromptRequest {
        PromptRequest {
            system: "sys".into(),
            user: user.into(),
            params: ModelParams {
                model: "m".into(),
                max_tokens: 10,
                temperature: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn disabled_client_reports_disabled() {
        let err = DisabledClient.complete(&request("x")).await.unwrap_err();
        assert_eq!(err, ModelCallError::Disabled);
    }

    #[tokio::test]
    async fn echo_mock_emits_one_record_per_post() {
        let out = EchoMockClient
            .complete(&request(
                "Post #1\nTitle: A\nURL: u1\n\nPost #2\nTitle: B\nURL: u2\n",
            ))
            .await
            .unwrap();
        assert_eq!(out.matches("Source:").count(), 2);
        assert!(out.contains("Source: u2"));
    }

    #[test]
    fn factory_picks_mock_and_disabled() {
        let mut cfg = LlmConfig::default();
        cfg.test_mode = Some("mock".into());
        assert_eq!(build_client_from_config(&cfg).unwrap().provider_name(), "mock");
        cfg.test_mode = None;
        cfg.api_key.clear();
        assert_eq!(
            build_client_from_config(&cfg).unwrap().provider_name(),
            "disabled"
        );
    }
}
