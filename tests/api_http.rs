// tests/api_http.rs
//
// Router-level tests via tower's oneshot; no socket is bound.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use less_assistant::config::{FeedsConfig, GatewayConfig};
use less_assistant::gateway::NOT_CONFIGURED_TEXT;
use less_assistant::news::{FeedFetcher, FeedItem};
use less_assistant::{build_state_with_fetcher, router, AppState};

struct Silent;

#[async_trait]
impl FeedFetcher for Silent {
    async fn fetch(&self, _url: &str, _limit: usize) -> Vec<FeedItem> {
        Vec::new()
    }
}

async fn state(cfg: GatewayConfig) -> AppState {
    build_state_with_fetcher(&cfg, Arc::new(FeedsConfig::default()), Arc::new(Silent))
        .await
        .unwrap()
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_chat(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok_and_starts_refresh_loop() {
    let st = state(GatewayConfig::default()).await;
    assert!(!st.scheduler.is_running());

    let (status, body) = call(router(st.clone()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert!(st.scheduler.is_running());
}

#[tokio::test]
async fn status_reports_resolution_and_key_presence_only() {
    let cfg = GatewayConfig {
        provider: Some("gemini".into()),
        gemini_api_key: Some("gm-secret".into()),
        ..GatewayConfig::default()
    };
    let (status, body) = call(router(state(cfg).await), get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "provider": "gemini",
            "model": "gemini-1.5-flash",
            "ready": true,
            "env": {"has_openai_key": false, "has_gemini_key": true, "has_groq_key": false}
        })
    );
    assert!(!body.to_string().contains("gm-secret"));
}

#[tokio::test]
async fn unsupported_provider_stays_unconfigured_with_keys_present() {
    let mut server = mockito::Server::new_async().await;
    let groq = server.mock("POST", "/chat/completions").expect(0).create_async().await;

    let cfg = GatewayConfig {
        provider: Some("claude".into()),
        openai_api_key: Some("sk-test".into()),
        groq_api_key: Some("gsk-test".into()),
        groq_base_url: server.url(),
        openai_base_url: server.url(),
        ..GatewayConfig::default()
    };
    let app = router(state(cfg).await);

    let (_, body) = call(app.clone(), get("/status")).await;
    assert_eq!(body["provider"], json!("claude"));
    assert_eq!(body["ready"], json!(false));
    assert_eq!(body["env"]["has_groq_key"], json!(true));

    let (status, body) = call(app, post_chat(json!({"message": "hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], json!(NOT_CONFIGURED_TEXT));
    groq.assert_async().await;
}

#[tokio::test]
async fn unknown_news_topic_reads_general() {
    let app = router(state(GatewayConfig::default()).await);
    let (status, body) = call(app.clone(), get("/news/latest?topic=sports")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic"], json!("general"));
    assert_eq!(body["items"], json!([]));

    let (_, body) = call(app, get("/news/latest?topic=Tech")).await;
    assert_eq!(body["topic"], json!("tech"));
}

#[tokio::test]
async fn chat_without_backend_answers_not_configured() {
    let app = router(state(GatewayConfig::default()).await);
    let (status, body) = call(app, post_chat(json!({"message": "  oi  "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], json!(NOT_CONFIGURED_TEXT));

    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["role"], json!("system"));
    assert_eq!(history[1], json!({"role": "user", "content": "oi"}));
    assert_eq!(history[2]["role"], json!("assistant"));
}

#[tokio::test]
async fn chat_rejects_blank_message() {
    let app = router(state(GatewayConfig::default()).await);
    let (status, body) = call(app, post_chat(json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("empty message"));
}

#[tokio::test]
async fn chat_coerces_unknown_roles_in_history() {
    let app = router(state(GatewayConfig::default()).await);
    let req = post_chat(json!({
        "message": "next",
        "history": [
            {"role": "system", "content": "custom prompt"},
            {"role": "tool", "content": "odd"},
            {"role": null}
        ]
    }));
    let (status, body) = call(app, req).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history[0], json!({"role": "system", "content": "custom prompt"}));
    assert_eq!(history[1], json!({"role": "user", "content": "odd"}));
    assert_eq!(history[2], json!({"role": "user", "content": ""}));
    assert_eq!(history[3], json!({"role": "user", "content": "next"}));
}

#[tokio::test]
async fn backend_failure_maps_to_500_with_detail() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let cfg = GatewayConfig {
        provider: Some("groq".into()),
        model: Some("llama-3.1-8b-instant".into()),
        groq_api_key: Some("gsk-test".into()),
        groq_base_url: server.url(),
        ..GatewayConfig::default()
    };
    let app = router(state(cfg).await);
    let (status, body) = call(app, post_chat(json!({"message": "hello"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], json!("500: internal"));
}
