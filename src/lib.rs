#![forbid(unsafe_code)]
#![doc = r#"
Rewrite Proxy

Rewrite a short message in a chosen tone by forwarding it to an OpenAI-compatible
Chat Completions endpoint, retrying transient upstream failures.

Crate highlights
- Library: `RewriteProxy::rewrite(&RewriteRequest)` selects a tone instruction, calls the
  upstream through a `CompletionTransport` with a bounded `RetryPolicy`, and extracts the text.
- HTTP server (in `server`): `/rewrite`, `/login` (plus `/api/*` aliases) and `/status`.
- Models: the inbound rewrite payloads and the outbound Chat Completions wire types.

Modules
- `models`: Rewrite request/response and Chat Completions data structures.
- `tone`: Tone identifiers and the immutable instruction table.
- `retry`: Pure retry policy (attempt budget, fixed delay, retryable statuses).
- `transport`: Upstream call seam and the reqwest implementation.
- `proxy`: The rewrite flow tying the above together.
- `error`: Error taxonomy and its HTTP rendering.
- `config`: Startup configuration.
- `login`: Password gate that sets the session cookie.
- `server`: Axum router/handlers (the binary uses this).
- `util`: Shared helpers (tracing, env files, HTTP client, CORS).

Note: the retry delay is constant (linear), not exponential.
"#]

pub mod config;
pub mod error;
pub mod login;
pub mod models;
pub mod proxy;
pub mod retry;
pub mod server;
pub mod tone;
pub mod transport;
pub mod util;

pub use crate::config::AppConfig;
pub use crate::error::RewriteError;
pub use crate::proxy::RewriteProxy;
pub use crate::retry::RetryPolicy;
pub use crate::tone::{Tone, ToneTemplates};

// Re-export model namespaces for convenience (downstream users can do `use rewrite_proxy::rewrite`).
pub use crate::models::{completion, rewrite};
