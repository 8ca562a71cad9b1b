// src/gateway/mod.rs
//! Provider gateway: resolves one model backend at startup and answers
//! conversational turns through it.
//!
//! Resolution happens once. `ready` is fixed at construction; the only later
//! change to the resolved configuration is the Groq model substitution after a
//! retired-model failover.

pub mod backends;
pub mod error;
pub mod message;

pub use backends::Backend;
pub use error::GatewayError;
pub use message::{Message, Role};

use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::RwLock;

use crate::config::GatewayConfig;
use backends::{GeminiBackend, GroqBackend, OpenAiBackend};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

pub const NOT_CONFIGURED_TEXT: &str =
    "Configure the AI provider and its API key to enable the assistant.";
pub const UNAVAILABLE_TEXT: &str =
    "The assistant is unavailable. Check GROQ_API_KEY and AI_PROVIDER=groq.";
pub const NO_RESPONSE_TEXT: &str = "No response from the AI.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Groq,
    Gemini,
}

impl ProviderKind {
    /// Case-insensitive; `None` for anything unsupported.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "groq" => Some(ProviderKind::Groq),
            "gemini" => Some(ProviderKind::Gemini),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit provider if set, else OpenAI with a key, else Groq with a key, else OpenAI.
///
/// A non-blank `AI_PROVIDER` is never overridden by credentials: an unsupported
/// value comes back as `Err(value)` and leaves the gateway unconfigured.
pub fn resolve_provider(cfg: &GatewayConfig) -> Result<ProviderKind, String> {
    if let Some(raw) = cfg.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        return ProviderKind::parse(raw).ok_or_else(|| raw.to_ascii_lowercase());
    }
    Ok(if cfg.openai_key().is_some() {
        ProviderKind::OpenAi
    } else if cfg.groq_key().is_some() {
        ProviderKind::Groq
    } else {
        ProviderKind::OpenAi
    })
}

/// Snapshot of the resolved configuration, as reported by `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    /// Backend name, or the unsupported `AI_PROVIDER` value as given.
    pub provider: String,
    pub model: String,
    pub ready: bool,
}

/// The gateway's persisted model id. Writes happen only on Groq failover;
/// racing writers are last-writer-wins.
#[derive(Debug)]
pub struct ModelSlot(RwLock<String>);

impl ModelSlot {
    pub fn new(model: impl Into<String>) -> Self {
        Self(RwLock::new(model.into()))
    }

    pub fn get(&self) -> String {
        self.0
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn set(&self, model: String) {
        *self.0.write().unwrap_or_else(|poison| poison.into_inner()) = model;
    }
}

/// Non-error outcome of a turn. Only [`GatewayError`] is returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text produced by the backend.
    Answer(String),
    /// No backend is ready; nothing was sent.
    NotConfigured,
    /// Backend rejected the credentials (Groq 401).
    Unavailable,
    /// Backend answered without any text (Gemini).
    NoResponse,
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(t) => t,
            Reply::NotConfigured => NOT_CONFIGURED_TEXT,
            Reply::Unavailable => UNAVAILABLE_TEXT,
            Reply::NoResponse => NO_RESPONSE_TEXT,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Answer(t) => t,
            other => other.text().to_string(),
        }
    }
}

pub struct ProviderGateway {
    provider: Option<ProviderKind>,
    /// Reported name; differs from `provider` only for an unsupported value.
    label: String,
    model: ModelSlot,
    backend: Option<Backend>,
}

impl ProviderGateway {
    /// Resolve provider, model and credentials. For Groq without an explicit
    /// model this performs model discovery against the backend.
    ///
    /// Missing credentials still produce a gateway (not ready); the only error
    /// is failing to build an HTTP client.
    pub async fn from_config(cfg: &GatewayConfig) -> Result<Self, GatewayError> {
        let explicit = cfg.model_override().map(str::to_string);
        let provider = match resolve_provider(cfg) {
            Ok(kind) => kind,
            Err(raw) => {
                tracing::warn!(provider = %raw, "unsupported AI_PROVIDER, assistant disabled");
                let gateway = Self {
                    provider: None,
                    label: raw,
                    model: ModelSlot::new(explicit.unwrap_or_default()),
                    backend: None,
                };
                return Ok(gateway);
            }
        };

        let (backend, model) = match provider {
            ProviderKind::OpenAi => {
                let backend = match cfg.openai_key() {
                    Some(key) => Some(Backend::OpenAi(OpenAiBackend::new(&cfg.openai_base_url, key)?)),
                    None => None,
                };
                (backend, explicit.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()))
            }
            ProviderKind::Gemini => {
                let backend = match cfg.gemini_key() {
                    Some(key) => Some(Backend::Gemini(GeminiBackend::new(&cfg.gemini_base_url, key)?)),
                    None => None,
                };
                (backend, explicit.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()))
            }
            ProviderKind::Groq => match cfg.groq_key() {
                Some(key) => {
                    let groq = GroqBackend::new(&cfg.groq_base_url, key)?;
                    let model = match explicit {
                        Some(m) => m,
                        None => groq.discover_model().await,
                    };
                    (Some(Backend::Groq(groq)), model)
                }
                None => (
                    None,
                    explicit.unwrap_or_else(|| backends::groq::FALLBACK_MODEL.to_string()),
                ),
            },
        };

        let gateway = Self {
            provider: Some(provider),
            label: provider.as_str().to_string(),
            model: ModelSlot::new(model),
            backend,
        };
        tracing::info!(
            provider = %gateway.label,
            model = %gateway.model.get(),
            ready = gateway.is_ready(),
            "AI provider resolved"
        );
        Ok(gateway)
    }

    /// `None` when `AI_PROVIDER` named an unsupported backend.
    pub fn provider(&self) -> Option<ProviderKind> {
        self.provider
    }

    pub fn model(&self) -> String {
        self.model.get()
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    pub fn config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.label.clone(),
            model: self.model(),
            ready: self.is_ready(),
        }
    }

    /// Answer one turn given the full (already bounded) history.
    ///
    /// A non-ready gateway returns [`Reply::NotConfigured`] without any network call.
    pub async fn respond(&self, history: &[Message]) -> Result<Reply, GatewayError> {
        let Some(backend) = &self.backend else {
            return Ok(Reply::NotConfigured);
        };

        let provider = backend.kind().as_str();
        counter!("gateway_requests_total", "provider" => provider).increment(1);
        let out = backend.complete(&self.model, history).await;
        match &out {
            Ok(Reply::Unavailable) => {
                counter!("gateway_auth_failures_total", "provider" => provider).increment(1);
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "backend failure");
                counter!("gateway_backend_errors_total", "provider" => provider).increment(1);
            }
            Ok(_) => {}
        }
        out
    }
}
