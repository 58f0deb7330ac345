use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy produced by the gateway. Every variant renders as a uniform
/// `{"error": string}` body; no raw exception ever reaches the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed caller input (400)
    #[error("{0}")]
    Validation(String),

    /// Resource absent upstream (404)
    #[error("{0}")]
    NotFound(String),

    /// Credentials or token rejected by the gateway itself (401)
    #[error("{0}")]
    Auth(String),

    /// Upstream answered with a non-2xx status; passed through
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Transport failure, generic routes (500)
    #[error("{0}")]
    Network(String),

    /// Upstream unreachable on routes with a connectivity message (503)
    #[error("{0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Network(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Pull a structured message out of an upstream error body.
/// Accepts either `{"message": ...}` or `{"error": ...}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
