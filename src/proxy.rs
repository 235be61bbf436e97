use std::sync::Arc;

use crate::config::CompletionSettings;
use crate::error::RewriteError;
use crate::models::completion::{ChatMessage, CompletionRequest, CompletionResponse};
use crate::models::rewrite::{RewriteRequest, RewrittenText};
use crate::retry::{AttemptOutcome, RetryDecision, RetryPolicy};
use crate::tone::{build_user_message, Tone, ToneTemplates};
use crate::transport::{CompletionTransport, TransportError, UpstreamReply};

/// Stateless rewrite flow: tone selection, bounded-retry upstream call, reply validation.
///
/// Holds only read-only configuration, so one instance is shared by all requests.
#[derive(Clone)]
pub struct RewriteProxy {
    transport: Arc<dyn CompletionTransport>,
    tones: Arc<ToneTemplates>,
    completion: CompletionSettings,
    policy: RetryPolicy,
}

impl RewriteProxy {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        tones: Arc<ToneTemplates>,
        completion: CompletionSettings,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            tones,
            completion,
            policy,
        }
    }

    pub fn tones(&self) -> &ToneTemplates {
        &self.tones
    }

    pub fn completion(&self) -> &CompletionSettings {
        &self.completion
    }

    /// Build the outbound payload for a validated request, along with the tone it resolved to.
    pub fn build_completion_request(&self, req: &RewriteRequest) -> (Tone, CompletionRequest) {
        let (tone, instruction) = self.tones.select(req.tone.as_deref());
        let payload = CompletionRequest {
            model: self.completion.model.clone(),
            messages: vec![
                ChatMessage::system(self.completion.system_prompt.as_str()),
                ChatMessage::user(build_user_message(instruction, &req.text)),
            ],
            max_tokens: self.completion.max_tokens,
        };
        (tone, payload)
    }

    /// Rewrite `req.text` in the requested tone.
    pub async fn rewrite(&self, req: &RewriteRequest) -> Result<RewrittenText, RewriteError> {
        let (tone, payload) = self.build_completion_request(req);
        tracing::debug!(tone = %tone, text_len = req.text.len(), "rewrite: selected tone");

        let result = self
            .call_with_retry(&payload)
            .await
            .and_then(|reply| extract_rewritten_text(&reply));
        match result {
            Ok(text) => Ok(RewrittenText::new(text)),
            Err(e) => {
                tracing::error!(error = %e, "rewrite failed");
                Err(e)
            }
        }
    }

    /// Issue the call, consulting the retry policy after each attempt.
    async fn call_with_retry(
        &self,
        payload: &CompletionRequest,
    ) -> Result<UpstreamReply, RewriteError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let (outcome, result) = match self.transport.send(payload).await {
                Ok(reply) => (AttemptOutcome::Status(reply.status), Ok(reply)),
                // The upstream already answered with a success status; the reply is malformed.
                Err(TransportError::Body(e)) => return Err(RewriteError::InvalidJson(e)),
                Err(e) => (
                    AttemptOutcome::TransportError,
                    Err(RewriteError::Transport(e.to_string())),
                ),
            };

            match self.policy.decide(attempt, outcome) {
                RetryDecision::Proceed => return result,
                RetryDecision::RetryAfter(delay) => {
                    match &result {
                        Ok(reply) => tracing::warn!(
                            "Retryable error ({}). Retrying in {} ms...",
                            reply.status.as_u16(),
                            delay.as_millis()
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            "Transport error. Retrying in {} ms...",
                            delay.as_millis()
                        ),
                    }
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    return Err(RewriteError::MaxRetriesExceeded { attempts: attempt });
                }
                RetryDecision::Abort => {
                    return Err(match result {
                        Ok(reply) => RewriteError::UpstreamStatus {
                            status: reply.status.as_u16(),
                        },
                        Err(e) => e,
                    });
                }
            }
        }
    }
}

/// Validate a successful upstream reply and pull out the trimmed first-choice content.
pub fn extract_rewritten_text(reply: &UpstreamReply) -> Result<String, RewriteError> {
    let is_json = reply
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
    if !is_json {
        return Err(RewriteError::UnexpectedContentType(reply.content_type.clone()));
    }

    let value: serde_json::Value = serde_json::from_slice(&reply.body)
        .map_err(|e| RewriteError::InvalidJson(e.to_string()))?;
    let parsed: CompletionResponse =
        serde_json::from_value(value).map_err(|_| RewriteError::InvalidResponseStructure)?;
    if !parsed.has_choices() {
        return Err(RewriteError::InvalidResponseStructure);
    }

    parsed
        .first_content()
        .map(|c| c.trim().to_string())
        .ok_or(RewriteError::InvalidResponseStructure)
}
