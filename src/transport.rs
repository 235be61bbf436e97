use async_trait::async_trait;
use bytes::Bytes;
use http::{header, StatusCode};
use thiserror::Error;

use crate::models::completion::CompletionRequest;

/// Raw upstream reply, before any validation.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[cfg(test)]
impl UpstreamReply {
    /// Convenience constructor for a JSON reply.
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(body.to_string()),
        }
    }

    /// Reply carrying only a status (bodies of failed attempts are never inspected).
    pub fn status_only(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
        }
    }
}

/// Failure of a single outbound call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No usable status was received (connection refused, DNS, timeout, ...).
    #[error("{0}")]
    Connect(String),
    /// A success status arrived but its body could not be read in full.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Connect(e.to_string())
    }
}

/// One outbound Chat Completions call. Implementations must not retry on their own.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, request: &CompletionRequest) -> Result<UpstreamReply, TransportError>;
}

/// reqwest-backed transport posting to `{base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: completions_endpoint(base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Join a base URL and the completions path without doubling slashes.
pub fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(&self, request: &CompletionRequest) -> Result<UpstreamReply, TransportError> {
        let mut rb = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        if !status.is_success() {
            return Ok(UpstreamReply {
                status,
                content_type,
                body: Bytes::new(),
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            completions_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://127.0.0.1:9/v1/"),
            "http://127.0.0.1:9/v1/chat/completions"
        );
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let t = HttpTransport::new(reqwest::Client::new(), "http://x/v1", Some("  ".into()));
        assert!(t.api_key.is_none());
        assert_eq!(t.endpoint(), "http://x/v1/chat/completions");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        // Port 9 (discard) is expected to refuse connections locally.
        let t = HttpTransport::new(reqwest::Client::new(), "http://127.0.0.1:9/v1", None);
        let req = CompletionRequest {
            model: "m".into(),
            messages: vec![],
            max_tokens: 1,
        };
        assert!(matches!(
            t.send(&req).await,
            Err(TransportError::Connect(_))
        ));
    }
}
