// src/gateway/backends/mod.rs
//! Concrete model backends. The gateway holds exactly one of them.
//!
//! Enum dispatch keeps the set closed: adding a backend means a new module,
//! a new variant and a new arm in `Backend::complete`.

pub mod gemini;
pub mod groq;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::gateway::{GatewayError, Message, ModelSlot, ProviderKind, Reply};

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use openai::OpenAiBackend;

#[derive(Debug, Clone)]
pub enum Backend {
    OpenAi(OpenAiBackend),
    Groq(GroqBackend),
    Gemini(GeminiBackend),
}

impl Backend {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Backend::OpenAi(_) => ProviderKind::OpenAi,
            Backend::Groq(_) => ProviderKind::Groq,
            Backend::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// One chat completion over the full history. Only the Groq backend may
    /// rewrite `model` (failover after a retired model).
    pub async fn complete(&self, model: &ModelSlot, messages: &[Message]) -> Result<Reply, GatewayError> {
        match self {
            Backend::OpenAi(b) => b.complete(&model.get(), messages).await,
            Backend::Groq(b) => b.complete(model, messages).await,
            Backend::Gemini(b) => b.complete(&model.get(), messages).await,
        }
    }
}

// ── Chat-completions wire types (OpenAI and Groq share them) ─────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice; a `null` content reads as empty text.
    pub(crate) fn into_first_content(self) -> Result<String, GatewayError> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| GatewayError::Decode("response has no choices".into()))
    }
}

/// Read the body of a failed response without losing the status.
pub(crate) async fn error_body(resp: reqwest::Response) -> (u16, String) {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    (status, body)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
