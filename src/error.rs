// Error handling module
// Defines error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur while talking to the listings API or the relay upstreams
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-success HTTP status from the backend
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Transport failure (connect, timeout, decode)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Session could not be recovered and has been torn down
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Missing or malformed caller credentials (relay)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Upstream service answered with an unusable response (relay)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a 401 answer from the backend
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Status { status, message } => {
                let status_code =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status_code, "api_error", message)
            }
            ApiError::Http(err) => {
                tracing::error!("Upstream transport error: {:?}", err);
                (StatusCode::BAD_GATEWAY, "http_error", err.to_string())
            }
            ApiError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "session_expired",
                "Session expired".to_string(),
            ),
            ApiError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "auth_error", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
