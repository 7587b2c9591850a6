//! Client error types.

use thiserror::Error;

use crate::store::StoreError;

/// Fallback message when the backend gives us nothing usable.
pub(crate) const GENERIC_FAILURE: &str = "Request failed";

/// Client error type.
///
/// Every expected failure of a backend call lands in one of these variants;
/// callers match on the kind and render [`ApiError::message`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or connection failure.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The credential expired and could not be renewed. Stored credentials
    /// have already been cleared; the user must sign in again.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// The backend rejected the request with a structured error body.
    #[error("API error ({status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the body.
        message: String,
        /// Raw error body, when it was JSON.
        body: Option<serde_json::Value>,
    },

    /// Success status, but the body does not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request body serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential persistence failed.
    #[error("Credential storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Human-readable message suitable for showing to the user.
    pub fn message(&self) -> String {
        match self {
            ApiError::Transport(e) if e.is_timeout() => "Request timed out".to_string(),
            ApiError::Transport(_) => "Unable to reach the server".to_string(),
            ApiError::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::MalformedResponse(message) => message.clone(),
            ApiError::InvalidUrl(_) | ApiError::Json(_) | ApiError::Config(_) | ApiError::Store(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the session was terminated and the user must sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Check if this is a structured rejection from the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation { .. })
    }

    /// Check if this is a network failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Validation { status: 404, .. })
    }

    /// Check if this is a permission error.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Validation { status: 403, .. })
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
