use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use codestorm::config::Config;
use codestorm::provider::anthropic::Anthropic;
use codestorm::provider::gemini::Gemini;
use codestorm::provider::ollama::Ollama;
use codestorm::provider::openai::OpenAi;
use codestorm::provider::{ModelRegistry, Provider};
use codestorm::StudioError;

fn config_for(server: &MockServer) -> Config {
    Config {
        openai_api_key: Some("sk-test".into()),
        anthropic_api_key: Some("ak-test".into()),
        gemini_api_key: Some("gk-test".into()),
        openai_base: format!("{}/v1", server.uri()),
        anthropic_base: server.uri(),
        gemini_base: server.uri(),
        ollama_url: server.uri(),
        ..Config::default()
    }
}

#[tokio::test]
async fn openai_sends_system_then_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "hola"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "respuesta"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let p = OpenAi::new(&config_for(&server), "gpt-4o", None).unwrap().with_system(Some("sys"));
    assert_eq!(p.invoke("hola").await.unwrap(), "respuesta");
}

#[tokio::test]
async fn openai_429_is_a_quota_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let p = OpenAi::new(&config_for(&server), "gpt-4o", None).unwrap();
    let err = p.invoke("hola").await.unwrap_err();
    assert!(err.is_quota(), "got {err:?}");
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    let cfg = Config { openai_api_key: None, ..config_for(&server) };
    let err = OpenAi::new(&cfg, "gpt-4o", None).unwrap().invoke("hola").await.unwrap_err();
    assert!(matches!(err, StudioError::Provider(ref m) if m.contains("OPENAI_API_KEY")));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn anthropic_uses_messages_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"model": "claude-3-opus-20240229", "max_tokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "hola desde claude"}]
        })))
        .mount(&server)
        .await;

    let p = Anthropic::new(&config_for(&server), "claude-3-opus-20240229", None).unwrap();
    assert_eq!(p.invoke("hola").await.unwrap(), "hola desde claude");
}

#[tokio::test]
async fn anthropic_server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let p = Anthropic::new(&config_for(&server), "claude-3-opus-20240229", None).unwrap();
    match p.invoke("hola").await.unwrap_err() {
        StudioError::Provider(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("overloaded"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn gemini_joins_candidate_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "gk-test"))
        .and(body_partial_json(json!({"contents": [{"parts": [{"text": "hola"}]}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "uno "}, {"text": "dos"}]}}]
        })))
        .mount(&server)
        .await;

    let p = Gemini::new(&config_for(&server), "gemini-1.5-flash", None).unwrap();
    assert_eq!(p.invoke("hola").await.unwrap(), "uno dos");
}

#[tokio::test]
async fn ollama_non_streaming_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "qwen2.5:7b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "qwen dice hola"}
        })))
        .mount(&server)
        .await;

    let p = Ollama::new(&server.uri(), "qwen2.5:7b", None).unwrap();
    assert_eq!(p.invoke("hola").await.unwrap(), "qwen dice hola");
}

#[tokio::test]
async fn quota_on_gpt4o_falls_back_to_gemini_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "```html\n<h1>Hola</h1>\n```"}]}}]
        })))
        .mount(&server)
        .await;

    let reg = Arc::new(ModelRegistry::from_config(&config_for(&server)).unwrap());
    let resp = reg.try_with_fallback("crea una web", "GPT-4O").await.unwrap();
    assert_eq!(resp.model, "Gemini 2.5 Flash");
    assert!(resp.fallback_used);
    assert!(resp.is_project_request);
    assert!(resp.content.contains("<h1>Hola</h1>"));
}
