// tests/ai_provider_http.rs
//
// OpenAI-compatible chat completions client against a local mock server.

use std::time::Duration;

use subreddit_digest::ai_adapter::{AiClient, ModelParams, OpenAiCompatProvider, PromptRequest};
use subreddit_digest::ModelCallError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> PromptRequest {
    PromptRequest {
        system: "instructions".into(),
        user: "Forum posts:\n\nPost #1\nTitle: A\nURL: u1\n".into(),
        params: ModelParams {
            model: "meta-llama/test".into(),
            max_tokens: 321,
            temperature: 0.2,
        },
    }
}

#[tokio::test]
async fn sends_params_and_returns_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "meta-llama/test",
            "max_tokens": 321,
            "messages": [
                {"role": "system", "content": "instructions"},
                {"role": "user", "content": "Forum posts:\n\nPost #1\nTitle: A\nURL: u1\n"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Title: A\nSummary: s\nSource: u1"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatProvider::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
    let text = provider.complete(&request()).await.unwrap();
    assert!(text.contains("Source: u1"));
}

#[tokio::test]
async fn non_2xx_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatProvider::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
    let err = provider.complete(&request()).await.unwrap_err();
    assert_eq!(
        err,
        ModelCallError::Status {
            status: 429,
            body: "rate limited".into()
        }
    );
}

#[tokio::test]
async fn blank_content_is_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        })))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatProvider::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
    let err = provider.complete(&request()).await.unwrap_err();
    assert_eq!(err, ModelCallError::EmptyResponse);
}

#[tokio::test]
async fn slow_provider_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let provider =
        OpenAiCompatProvider::new(&server.uri(), "sk-test", Duration::from_millis(200)).unwrap();
    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ModelCallError::Transport(_)), "{err:?}");
}
