// src/gateway/backends/openai.rs
use reqwest::Client;
use std::time::Duration;

use super::{error_body, join_url, ChatRequest, ChatResponse};
use crate::gateway::{GatewayError, Message, Reply};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI Chat Completions. Every failure propagates unchanged.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiBackend {
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
        let resp = self
            .http
            .post(join_url(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest { model, messages })
            .send()
            .await?;

        if !resp.status().is_success() {
            let (status, body) = error_body(resp).await;
            tracing::warn!(provider = "openai", model, status, "backend returned an error");
            return Err(GatewayError::Backend { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        Ok(Reply::Answer(parsed.into_first_content()?))
    }
}
