use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use thiserror::Error;

/// Failure classes of a rewrite request.
///
/// The `Display` text of each variant is the human-readable message returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Only POST requests allowed")]
    MethodNotAllowed,
    #[error("Invalid or missing \"text\" in request body")]
    InvalidText,
    /// Upstream answered with a status that is not worth retrying.
    #[error("API request failed with status {status}")]
    UpstreamStatus { status: u16 },
    /// Every attempt in the budget hit a retryable failure.
    #[error("Max retries exceeded")]
    MaxRetriesExceeded { attempts: u32 },
    #[error("Unexpected response type: {}", .0.as_deref().unwrap_or("null"))]
    UnexpectedContentType(Option<String>),
    #[error("Invalid API response structure")]
    InvalidResponseStructure,
    #[error("Invalid JSON in API response: {0}")]
    InvalidJson(String),
    /// Network-level failure before any status was received.
    #[error("Upstream request failed: {0}")]
    Transport(String),
}

impl RewriteError {
    /// HTTP status surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidText => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body surfaced to the caller. Method rejections use `message`, all else `error`.
    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::MethodNotAllowed => serde_json::json!({ "message": self.to_string() }),
            _ => serde_json::json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for RewriteError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
