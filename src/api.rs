// src/api.rs
//! Thin HTTP surface over the gateway and the news cache.

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::CredentialPresence;
use crate::conversation;
use crate::gateway::{Message, ProviderGateway};
use crate::news::{NewsCache, NewsView, RefreshScheduler};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ProviderGateway>,
    pub news: Arc<NewsCache>,
    pub scheduler: Arc<RefreshScheduler>,
    pub credentials: CredentialPresence,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/news/latest", get(news_latest))
        .route("/chat", post(chat))
        .layer(middleware::from_fn_with_state(state.clone(), ensure_refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Any request makes sure the refresh loop is running (no-op after the first start).
async fn ensure_refresh(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.scheduler.start() {
        tracing::debug!("news refresh loop started by incoming request");
    }
    next.run(req).await
}

#[derive(Serialize)]
struct HealthResp {
    ok: bool,
    updated_at: Option<DateTime<Utc>>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    Json(HealthResp {
        ok: true,
        updated_at: state.news.updated_at(),
    })
}

#[derive(Serialize)]
struct StatusResp {
    provider: String,
    model: String,
    ready: bool,
    env: CredentialPresence,
}

async fn status(State(state): State<AppState>) -> Json<StatusResp> {
    let cfg = state.gateway.config();
    Json(StatusResp {
        provider: cfg.provider,
        model: cfg.model,
        ready: cfg.ready,
        env: state.credentials,
    })
}

#[derive(Deserialize)]
struct NewsQuery {
    #[serde(default)]
    topic: Option<String>,
}

/// Reads the cache only; never triggers a fetch. Missing or unknown topics read `general`.
async fn news_latest(State(state): State<AppState>, Query(q): Query<NewsQuery>) -> Json<NewsView> {
    Json(state.news.view(q.topic.as_deref().unwrap_or_default()))
}

#[derive(Deserialize)]
struct ChatReq {
    #[serde(default)]
    message: String,
    #[serde(default)]
    history: Vec<Message>,
}

#[derive(Serialize)]
struct ChatResp {
    reply: String,
    history: Vec<Message>,
}

#[derive(Serialize)]
struct ErrorResp {
    error: &'static str,
    detail: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatReq>,
) -> Result<Json<ChatResp>, (StatusCode, Json<ErrorResp>)> {
    if body.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResp {
                error: "empty message",
                detail: "send a non-empty `message`".to_string(),
            }),
        ));
    }

    let history = conversation::prepare_turn(body.history, &body.message);
    match state.gateway.respond(&history).await {
        Ok(reply) => {
            let reply = reply.into_text();
            let history = conversation::record_reply(history, reply.clone());
            Ok(Json(ChatResp { reply, history }))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResp {
                error: "failed to generate a reply",
                detail: e.to_string(),
            }),
        )),
    }
}
