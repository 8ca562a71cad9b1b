// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}
fn default_groq_base_url() -> String {
    DEFAULT_GROQ_BASE_URL.to_string()
}
fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

/// Everything the provider gateway needs to resolve a backend at startup.
///
/// Keys are kept as `Option<String>`; blank values count as absent.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// "openai" | "groq" | "gemini" (case-insensitive). `None` means auto-select.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model override; each backend has its own default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            openai_api_key: None,
            groq_api_key: None,
            gemini_api_key: None,
            openai_base_url: default_openai_base_url(),
            groq_base_url: default_groq_base_url(),
            gemini_base_url: default_gemini_base_url(),
        }
    }
}

// Keys must never end up in logs, so Debug only reports presence.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("credentials", &self.credentials())
            .field("openai_base_url", &self.openai_base_url)
            .field("groq_base_url", &self.groq_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .finish()
    }
}

/// Which credentials are configured (never the values themselves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialPresence {
    pub has_openai_key: bool,
    pub has_gemini_key: bool,
    pub has_groq_key: bool,
}

impl GatewayConfig {
    /// Read `AI_PROVIDER`, `AI_MODEL`, the three API keys and optional base URL overrides.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            provider: non_blank(env::var("AI_PROVIDER").ok()).map(|p| p.to_lowercase()),
            model: non_blank(env::var("AI_MODEL").ok()),
            openai_api_key: non_blank(env::var("OPENAI_API_KEY").ok()),
            groq_api_key: non_blank(env::var("GROQ_API_KEY").ok()),
            gemini_api_key: non_blank(env::var("GEMINI_API_KEY").ok()),
            openai_base_url: non_blank(env::var("OPENAI_BASE_URL").ok())
                .unwrap_or(base.openai_base_url),
            groq_base_url: non_blank(env::var("GROQ_BASE_URL").ok()).unwrap_or(base.groq_base_url),
            gemini_base_url: non_blank(env::var("GEMINI_BASE_URL").ok())
                .unwrap_or(base.gemini_base_url),
        }
    }

    pub fn credentials(&self) -> CredentialPresence {
        CredentialPresence {
            has_openai_key: self.openai_key().is_some(),
            has_gemini_key: self.gemini_key().is_some(),
            has_groq_key: self.groq_key().is_some(),
        }
    }

    pub fn openai_key(&self) -> Option<&str> {
        usable(&self.openai_api_key)
    }

    pub fn groq_key(&self) -> Option<&str> {
        usable(&self.groq_api_key)
    }

    pub fn gemini_key(&self) -> Option<&str> {
        usable(&self.gemini_api_key)
    }

    /// Explicit model override, if one was given.
    pub fn model_override(&self) -> Option<&str> {
        usable(&self.model)
    }
}

fn usable(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_count_as_absent() {
        let cfg = GatewayConfig {
            openai_api_key: Some("   ".into()),
            groq_api_key: Some("gsk_live".into()),
            ..GatewayConfig::default()
        };
        let creds = cfg.credentials();
        assert!(!creds.has_openai_key);
        assert!(creds.has_groq_key);
        assert!(!creds.has_gemini_key);
    }

    #[test]
    fn debug_output_hides_keys() {
        let cfg = GatewayConfig {
            openai_api_key: Some("sk-secret-value".into()),
            ..GatewayConfig::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-secret-value"));
        assert!(dbg.contains("has_openai_key: true"));
    }

    #[serial_test::serial]
    #[test]
    fn from_env_lowercases_provider_and_reads_overrides() {
        env::set_var("AI_PROVIDER", " Groq ");
        env::set_var("AI_MODEL", "");
        env::set_var("GROQ_BASE_URL", "http://127.0.0.1:1/groq");
        env::remove_var("OPENAI_BASE_URL");

        let cfg = GatewayConfig::from_env();
        assert_eq!(cfg.provider.as_deref(), Some("groq"));
        assert_eq!(cfg.model, None);
        assert_eq!(cfg.groq_base_url, "http://127.0.0.1:1/groq");
        assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);

        env::remove_var("AI_PROVIDER");
        env::remove_var("AI_MODEL");
        env::remove_var("GROQ_BASE_URL");
    }
}
