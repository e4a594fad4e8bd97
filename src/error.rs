//! Error taxonomy for the client.
//!
//! Exactly two failure shapes exist (matching what callers can act on):
//! a typed API error carrying the HTTP status and raw body, and a
//! transport/parse error normalized to status 0.

use serde_json::Value;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A non-2xx HTTP response from the backend.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        /// Raw JSON error body, when one could be read.
        payload: Option<Value>,
    },

    /// Network failure or an unreadable/non-JSON body. Reported as status 0.
    #[error("network error: {message}")]
    Network { message: String },
}

impl ApiError {
    /// HTTP status of the failure; `0` for transport/parse errors.
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Network { .. } => 0,
        }
    }

    /// Human-readable message, without the status suffix.
    pub fn message(&self) -> &str {
        match self {
            Self::Api { message, .. } => message,
            Self::Network { message } => message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Network {
            message: format!("invalid JSON from backend: {err}"),
        }
    }
}

/// Resolve the human message from a JSON error body.
///
/// The backend (FastAPI) reports errors under `detail`; older deployments
/// used `message` or `error`. First present key wins.
pub(crate) fn resolve_error_message(body: &Value) -> Option<String> {
    for key in ["detail", "message", "error"] {
        if let Some(s) = body.get(key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Fallback message for a status code when the body carries none.
pub(crate) fn status_message(status: u16) -> String {
    match status {
        401 => "Authentication required or token expired".to_string(),
        403 => "Not authorized for this operation".to_string(),
        404 => "Resource not found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s})"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}
