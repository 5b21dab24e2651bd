//! # End-to-End Tests
//!
//! A real relay bound to an ephemeral port, `wiremock` upstreams, and the
//! playground client on the other side.

use playground_relay::{
    create_router, AppState, CancelHandle, Config, ConsumeOutcome, Playground, RelayClient, RunOutcome,
    StreamSession, TokenUsage,
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn sse(records: &[&str]) -> String {
    records.iter().map(|r| format!("data: {}\n\n", r)).collect()
}

async fn spawn_relay(config: Config) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(AppState::new(config).unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn config_for(upstream: &MockServer) -> Config {
    let mut config = Config::for_test();
    config.groq_base_url = upstream.uri();
    config.openai_base_url = upstream.uri();
    config.groq_api_key = Some("gsk-test".to_string());
    config.openai_api_key = Some("sk-test".to_string());
    config
}

async fn mount_groq_answer(upstream: &MockServer, model: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": model })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[
                r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}],"x_groq":{"id":"req_1"}}"#,
                r#"{"choices":[{"index":0,"delta":{"content":"2 + 2"}}]}"#,
                r#"{"choices":[{"index":0,"delta":{"content":" = 4"}}]}"#,
                r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}],"x_groq":{"id":"req_1","usage":{"prompt_tokens":12,"completion_tokens":5,"total_tokens":17}}}"#,
                "[DONE]",
            ]),
            "text/event-stream",
        ))
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn test_single_run_with_groq_usage() {
    let upstream = MockServer::start().await;
    mount_groq_answer(&upstream, "llama-3.3-70b-versatile").await;

    let relay = spawn_relay(config_for(&upstream)).await;
    let mut playground = Playground::new(RelayClient::new(relay).unwrap());
    playground.prompt = "What is 2+2?".to_string();

    let outcome = playground.submit().await;

    assert_eq!(outcome, Some(RunOutcome::Single(ConsumeOutcome::Completed)));
    let session = &playground.primary;
    assert_eq!(session.response, "2 + 2 = 4");
    assert_eq!(
        session.usage,
        Some(TokenUsage {
            prompt_tokens: 12,
            completion_tokens: 5,
            total_tokens: 17
        })
    );
    assert!(session.error.is_none());
    assert!(session.response_time.is_some());
    assert!(!session.is_streaming);
    assert_eq!(playground.history.entries(), ["What is 2+2?"]);
}

#[tokio::test]
async fn test_compare_failure_is_isolated() {
    let upstream = MockServer::start().await;
    mount_groq_answer(&upstream, "llama-3.3-70b-versatile").await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-3.5-turbo" })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&upstream)
        .await;

    let relay = spawn_relay(config_for(&upstream)).await;
    let mut playground = Playground::new(RelayClient::new(relay).unwrap());
    playground.prompt = "What is 2+2?".to_string();
    playground.compare_mode = true;

    let outcome = playground.submit().await;

    assert_eq!(
        outcome,
        Some(RunOutcome::Compare(ConsumeOutcome::Completed, ConsumeOutcome::Failed))
    );
    assert_eq!(playground.primary.response, "2 + 2 = 4");
    assert!(playground.primary.error.is_none());
    assert_eq!(playground.compare.response, "");
    assert_eq!(playground.compare.error.as_deref(), Some("401 Incorrect API key provided"));

    // One shared elapsed time, stamped after both finished
    assert!(playground.primary.response_time.is_some());
    assert_eq!(playground.primary.response_time, playground.compare.response_time);
}

#[tokio::test]
async fn test_missing_credential_surfaces_error_body() {
    let upstream = MockServer::start().await;
    let mut config = config_for(&upstream);
    config.openai_api_key = None;

    let relay = spawn_relay(config).await;
    let client = RelayClient::new(relay).unwrap();
    let request = playground_relay::CompletionRequest::new("Hi", "gpt-4o");

    let mut session = StreamSession::new("gpt-4o");
    let outcome = client.stream(&request, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Failed);
    assert_eq!(session.error.as_deref(), Some("OPENAI_API_KEY not configured"));
}

#[tokio::test]
async fn test_stop_cancels_without_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&["[DONE]"]), "text/event-stream")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&upstream)
        .await;

    let relay = spawn_relay(config_for(&upstream)).await;
    let mut playground = Playground::new(RelayClient::new(relay).unwrap());
    playground.prompt = "Tell me a long story".to_string();

    let stop = playground.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.stop();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), playground.submit())
        .await
        .expect("stop should end the run promptly");

    assert_eq!(outcome, Some(RunOutcome::Single(ConsumeOutcome::Cancelled)));
    assert!(playground.primary.error.is_none());
    assert!(playground.primary.response_time.is_none());
    assert!(!playground.primary.is_streaming);
}

#[tokio::test]
async fn test_relay_client_reports_http_status_without_body() {
    let fake_relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&fake_relay)
        .await;

    let client = RelayClient::new(fake_relay.uri()).unwrap();
    let request = playground_relay::CompletionRequest::new("Hi", "gpt-4o");
    let mut session = StreamSession::default();

    let outcome = client.stream(&request, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Failed);
    assert_eq!(session.error.as_deref(), Some("HTTP error 503"));
}
