use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RewriteError;

/// Inbound rewrite request: `{ "text": "...", "tone": "friendly" }`.
///
/// `text` is required and must be a non-empty string. `tone` is optional and
/// matched case-insensitively; anything that is not a string is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>, tone: Option<&str>) -> Self {
        Self {
            text: text.into(),
            tone: tone.map(str::to_owned),
        }
    }

    /// Validate a raw request body.
    ///
    /// Bodies that are not JSON objects, or whose `text` is missing, empty, or not a
    /// string, are rejected with [`RewriteError::InvalidText`].
    pub fn from_slice(body: &[u8]) -> Result<Self, RewriteError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RewriteError::InvalidText)?;
        Self::from_json(&value)
    }

    /// Validate an already-parsed JSON body.
    pub fn from_json(body: &Value) -> Result<Self, RewriteError> {
        let text = body
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(RewriteError::InvalidText)?;
        let tone = body.get("tone").and_then(Value::as_str);
        Ok(Self::new(text, tone))
    }
}

/// Successful reply body: `{ "rewritten_text": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenText {
    pub rewritten_text: String,
}

impl RewrittenText {
    pub fn new(rewritten_text: impl Into<String>) -> Self {
        Self {
            rewritten_text: rewritten_text.into(),
        }
    }
}
