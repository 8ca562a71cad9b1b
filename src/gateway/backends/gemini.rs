// src/gateway/backends/gemini.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{error_body, join_url};
use crate::gateway::{GatewayError, Message, Reply};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini `generateContent`. The history is flattened into one prompt.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

impl GeminiBackend {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn complete(&self, model: &str, messages: &[Message]) -> Result<Reply, GatewayError> {
        let prompt = flatten_prompt(messages);
        let req = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: &prompt }],
            }],
        };

        let resp = self
            .http
            .post(join_url(&self.base_url, &format!("models/{model}:generateContent")))
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let (status, body) = error_body(resp).await;
            tracing::warn!(provider = "gemini", model, status, "backend returned an error");
            return Err(GatewayError::Backend { status, body });
        }

        let parsed: GenerateResponse = resp.json().await?;
        Ok(match parsed.text() {
            Some(text) => Reply::Answer(text),
            None => Reply::NoResponse,
        })
    }
}

/// `"<Role>: <content>"` per message, joined by newlines.
pub fn flatten_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.capitalized(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
