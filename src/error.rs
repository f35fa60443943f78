use reqwest::StatusCode;
use thiserror::Error;

pub const GENERIC_NETWORK_MESSAGE: &str = "No se pudo conectar con el servidor. Intenta de nuevo.";

/// Failures talking to the copy backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")] Validation(String),
    #[error("network error: {0}")] Network(String),
    #[error("server error (status {status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Server { status: StatusCode, detail: Option<String> },
    #[error("decode error: {0}")] Decode(String),
}

impl ClientError {
    /// Dismissible text shown to the user. Server detail wins when present.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Network(_) => GENERIC_NETWORK_MESSAGE.to_string(),
            ClientError::Server { detail: Some(d), .. } => d.clone(),
            ClientError::Server { .. } | ClientError::Decode(_) => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() { ClientError::Decode(e.to_string()) } else { ClientError::Network(e.to_string()) }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClipboardError {
    #[error("clipboard access denied")] Denied,
    #[error("clipboard unsupported")] Unsupported,
    #[error("clipboard write failed: {0}")] Other(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShareError {
    #[error("share unsupported for {0}")] Unsupported(String),
    #[error("popup blocked")] Blocked,
    #[error("share failed: {0}")] Other(String),
}
