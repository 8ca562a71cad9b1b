// src/gateway/error.rs
use thiserror::Error;

/// Failures that unwind out of `ProviderGateway::respond`.
///
/// Missing configuration and rejected credentials are not errors; see `Reply`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Backend answered with a non-success status.
    #[error("{status}: {body}")]
    Backend { status: u16, body: String },
    /// Connection, TLS or timeout failure before a status was received.
    #[error("backend request failed: {0}")]
    Transport(String),
    /// Success status but the body did not have the expected shape.
    #[error("unexpected backend response: {0}")]
    Decode(String),
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}
