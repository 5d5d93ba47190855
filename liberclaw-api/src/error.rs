use liberclaw_auth::AuthError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by every call into the LiberClaw API.
///
/// `Clone` so a single refresh failure can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(Arc<serde_json::Error>),

    #[error("Stream timed out waiting for the agent")]
    Timeout,

    #[error("Session refresh failed: {0}")]
    Refresh(Box<ApiError>),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Build an HTTP error from a non-2xx response body, preferring the
    /// backend's `detail` message.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorResponse>(body)
            .ok()
            .and_then(|response| response.detail)
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));

        ApiError::Http { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Refresh(inner) => inner.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// True when the session can no longer be recovered and the user has to
    /// sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Refresh(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Network(Arc::new(value))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::Decode(Arc::new(value))
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        ApiError::Storage(value.to_string())
    }
}

/// Error body shape used by the backend. `detail` is a string for handled
/// errors and a list for validation failures, so anything else is ignored.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default, deserialize_with = "detail_string")]
    detail: Option<String>,
}

fn detail_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(detail) if !detail.is_empty() => Some(detail),
        _ => None,
    })
}
