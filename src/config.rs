//! Startup configuration.
//!
//! Everything the service needs from the environment is read once, in `main`, into an
//! [`AppConfig`] that is then passed down explicitly. Request handling never touches
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that rewrites internal messages.";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8088";

/// Fixed parts of every outbound completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSettings {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// CORS settings; `None` lists mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsSettings {
    pub allowed_origins: Option<Vec<String>>,
    pub allowed_methods: Option<Vec<String>>,
    pub allowed_headers: Option<Vec<String>>,
    pub allow_credentials: bool,
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Bearer credential for the completion API.
    pub api_key: Option<String>,
    pub base_url: String,
    pub completion: CompletionSettings,
    pub retry: RetryPolicy,
    /// Per-attempt deadline for the upstream call.
    pub http_timeout: Option<Duration>,
    /// Optional JSON file with tone instruction overrides.
    pub tones_config: Option<PathBuf>,
    /// Secret for the login gate. `None` rejects every login.
    pub login_password: Option<String>,
    pub cors: CorsSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            completion: CompletionSettings::default(),
            retry: RetryPolicy::default(),
            http_timeout: None,
            tones_config: None,
            login_password: None,
            cors: CorsSettings::default(),
        }
    }
}

impl AppConfig {
    /// Build from the process environment.
    ///
    /// Environment:
    /// - OPENAI_API_KEY, OPENAI_BASE_URL
    /// - REWRITE_MODEL, REWRITE_MAX_TOKENS, REWRITE_SYSTEM_PROMPT
    /// - REWRITE_MAX_ATTEMPTS, REWRITE_RETRY_DELAY_MS, REWRITE_RETRY_ON_TRANSPORT_ERROR
    /// - REWRITE_HTTP_TIMEOUT_SECONDS, REWRITE_TONES_CONFIG
    /// - LOGIN_PASSWORD, BIND_ADDR
    /// - CORS_ALLOWED_ORIGINS, CORS_ALLOWED_METHODS, CORS_ALLOWED_HEADERS,
    ///   CORS_ALLOW_CREDENTIALS, CORS_MAX_AGE
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let completion = CompletionSettings {
            model: get("REWRITE_MODEL").unwrap_or(defaults.completion.model),
            system_prompt: get("REWRITE_SYSTEM_PROMPT")
                .unwrap_or(defaults.completion.system_prompt),
            max_tokens: parse_or(
                get("REWRITE_MAX_TOKENS"),
                "REWRITE_MAX_TOKENS",
                DEFAULT_MAX_TOKENS,
            ),
        };

        let max_attempts = parse_or(
            get("REWRITE_MAX_ATTEMPTS"),
            "REWRITE_MAX_ATTEMPTS",
            DEFAULT_MAX_ATTEMPTS,
        );
        let delay_ms = parse_or(
            get("REWRITE_RETRY_DELAY_MS"),
            "REWRITE_RETRY_DELAY_MS",
            DEFAULT_RETRY_DELAY.as_millis() as u64,
        );
        let retry = RetryPolicy::new(max_attempts, Duration::from_millis(delay_ms))
            .with_transport_retries(is_truthy(get("REWRITE_RETRY_ON_TRANSPORT_ERROR")));

        let http_timeout = get("REWRITE_HTTP_TIMEOUT_SECONDS")
            .and_then(|v| parse_opt::<u64>(&v, "REWRITE_HTTP_TIMEOUT_SECONDS"))
            .map(Duration::from_secs);

        let cors = CorsSettings {
            allowed_origins: get("CORS_ALLOWED_ORIGINS").and_then(|v| split_list(&v)),
            allowed_methods: get("CORS_ALLOWED_METHODS").and_then(|v| split_list(&v)),
            allowed_headers: get("CORS_ALLOWED_HEADERS").and_then(|v| split_list(&v)),
            allow_credentials: is_truthy(get("CORS_ALLOW_CREDENTIALS")),
            max_age: get("CORS_MAX_AGE")
                .and_then(|v| parse_opt::<u64>(&v, "CORS_MAX_AGE"))
                .map(Duration::from_secs),
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            completion,
            retry,
            http_timeout,
            tones_config: get("REWRITE_TONES_CONFIG").map(PathBuf::from),
            login_password: get("LOGIN_PASSWORD"),
            cors,
        }
    }
}

/// Truthy values: 1, true, yes, on (case-insensitive).
pub fn is_truthy(value: Option<String>) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .map(|v| v == "1" || v == "true" || v == "yes" || v == "on")
        .unwrap_or(false)
}

fn parse_opt<T: std::str::FromStr>(value: &str, key: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, value);
            None
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    value.and_then(|v| parse_opt(&v, key)).unwrap_or(default)
}

/// Comma-separated list; "*" or an empty list means "any" (`None`).
fn split_list(value: &str) -> Option<Vec<String>> {
    if value.trim() == "*" {
        return None;
    }
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
