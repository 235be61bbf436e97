//! Password gate in front of the UI.
//!
//! A single configured secret is compared against the submitted password; on match the
//! caller receives a session-indicating cookie. The rewrite endpoint itself does not check
//! the cookie.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{header, StatusCode};
use serde::{Deserialize, Serialize};

/// Cookie set on a successful login.
pub const SESSION_COOKIE: &str = "authenticated=true; HttpOnly; Path=/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
}

/// True only when a password is configured and the supplied one equals it.
pub fn password_matches(configured: Option<&str>, supplied: Option<&str>) -> bool {
    matches!((configured, supplied), (Some(c), Some(s)) if c == s)
}

/// Extract the `password` string from a raw JSON body, if any.
pub fn supplied_password(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("password")?.as_str().map(str::to_owned)
}

impl IntoResponse for LoginOutcome {
    fn into_response(self) -> Response {
        if self.success {
            (
                StatusCode::OK,
                [(header::SET_COOKIE, SESSION_COOKIE)],
                Json(self),
            )
                .into_response()
        } else {
            (StatusCode::UNAUTHORIZED, Json(self)).into_response()
        }
    }
}
