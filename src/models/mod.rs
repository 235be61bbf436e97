//! Data models for the rewrite endpoint and the upstream Chat Completions API.
//!
//! This module groups two submodules:
//! - `rewrite`: The inbound `{ text, tone }` request and the `{ rewritten_text }` reply.
//! - `completion`: The subset of the Chat Completions request/response used upstream.
//!
//! The flow that turns a `rewrite::RewriteRequest` into a `completion::CompletionRequest`
//! lives in `crate::proxy`.

pub mod completion;
pub mod rewrite;

pub use completion::{
    ChatMessage, Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Role,
};
pub use rewrite::{RewriteRequest, RewrittenText};
