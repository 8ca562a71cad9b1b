// src/gateway/backends/groq.rs
//! Groq (OpenAI-compatible wire format) with model discovery and one-shot failover.

use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{error_body, join_url, ChatRequest, ChatResponse};
use crate::gateway::{GatewayError, Message, ModelSlot, Reply};

/// Ordered preference when picking a model from the listing.
pub const MODEL_PREFERENCES: [&str; 4] = [
    "llama-3.1-8b-instant",
    "llama-3.3-70b-versatile",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

/// Used when discovery fails or the listing is empty.
pub const FALLBACK_MODEL: &str = "llama-3.1-8b-instant";

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Markers in a 400/404 body that mean the requested model is gone.
const MODEL_GONE_MARKERS: [&str; 2] = ["model_decommissioned", "model_not_found"];

#[derive(Debug, Clone)]
pub struct GroqBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: Option<String>,
}

/// Outcome of a single POST, before any failover decision.
enum Attempt {
    Answer(String),
    Unauthorized,
    ModelGone { status: u16, body: String },
    Failed { status: u16, body: String },
}

impl GroqBackend {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Ask the models endpoint which model to use. Never fails: any error,
    /// non-success status or empty listing yields [`FALLBACK_MODEL`].
    pub async fn discover_model(&self) -> String {
        let resp = self
            .http
            .get(join_url(&self.base_url, "models"))
            .bearer_auth(&self.api_key)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await;

        let listing = match resp {
            Ok(r) if r.status().is_success() => r.json::<ModelList>().await.ok(),
            Ok(r) => {
                tracing::warn!(provider = "groq", status = r.status().as_u16(), "model listing rejected");
                None
            }
            Err(e) => {
                tracing::warn!(provider = "groq", error = %e, "model listing failed");
                None
            }
        };

        let ids: Vec<String> = listing
            .map(|l| l.data.into_iter().filter_map(|m| m.id).collect())
            .unwrap_or_default();
        let picked = pick_model(&ids);
        tracing::info!(provider = "groq", model = %picked, listed = ids.len(), "discovered model");
        picked
    }

    /// POST the history; on a retired model rediscover, persist the new model
    /// into `model` and retry exactly once.
    pub async fn complete(&self, model: &ModelSlot, messages: &[Message]) -> Result<Reply, GatewayError> {
        let current = model.get();
        let (status, body) = match self.post_chat(&current, messages).await? {
            Attempt::Answer(text) => return Ok(Reply::Answer(text)),
            Attempt::Unauthorized => return Ok(Reply::Unavailable),
            Attempt::Failed { status, body } => return Err(GatewayError::Backend { status, body }),
            Attempt::ModelGone { status, body } => (status, body),
        };

        tracing::warn!(provider = "groq", model = %current, status, body = %body, "model unavailable, rediscovering");
        counter!("gateway_failover_total").increment(1);
        let replacement = self.discover_model().await;
        model.set(replacement.clone());

        match self.post_chat(&replacement, messages).await? {
            Attempt::Answer(text) => Ok(Reply::Answer(text)),
            Attempt::Unauthorized => Ok(Reply::Unavailable),
            Attempt::ModelGone { status, body } | Attempt::Failed { status, body } => {
                Err(GatewayError::Backend { status, body })
            }
        }
    }

    async fn post_chat(&self, model: &str, messages: &[Message]) -> Result<Attempt, GatewayError> {
        let resp = self
            .http
            .post(join_url(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .timeout(CHAT_TIMEOUT)
            .json(&ChatRequest { model, messages })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let parsed: ChatResponse = resp.json().await?;
            return Ok(Attempt::Answer(parsed.into_first_content()?));
        }
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(provider = "groq", "credentials rejected (401)");
            return Ok(Attempt::Unauthorized);
        }

        let (status, body) = error_body(resp).await;
        if is_model_gone(status, &body) {
            Ok(Attempt::ModelGone { status, body })
        } else {
            Ok(Attempt::Failed { status, body })
        }
    }
}

/// First preferred id present in the listing, else the first listed id,
/// else [`FALLBACK_MODEL`].
pub fn pick_model(ids: &[String]) -> String {
    MODEL_PREFERENCES
        .iter()
        .find(|p| ids.iter().any(|id| id == *p))
        .map(|p| p.to_string())
        .or_else(|| ids.first().cloned())
        .unwrap_or_else(|| FALLBACK_MODEL.to_string())
}

fn is_model_gone(status: u16, body: &str) -> bool {
    matches!(status, 400 | 404) && MODEL_GONE_MARKERS.iter().any(|m| body.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preference_order_beats_listing_order() {
        let listed = ids(&["gemma2-9b-it", "whisper-large-v3", "mixtral-8x7b-32768"]);
        assert_eq!(pick_model(&listed), "mixtral-8x7b-32768");
    }

    #[test]
    fn falls_back_to_first_listed_then_default() {
        assert_eq!(pick_model(&ids(&["qwen-qwq-32b", "other"])), "qwen-qwq-32b");
        assert_eq!(pick_model(&[]), FALLBACK_MODEL);
    }

    #[test]
    fn model_gone_needs_status_and_marker() {
        assert!(is_model_gone(400, r#"{"error":{"code":"model_decommissioned"}}"#));
        assert!(is_model_gone(404, "model_not_found"));
        assert!(!is_model_gone(500, "model_not_found"));
        assert!(!is_model_gone(404, "route not found"));
    }
}
