use std::path::Path;

use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, CorsSettings};

/// Load an env file and initialize structured tracing based on RUST_LOG.
///
/// - Explicit env file paths via ENV_FILE, ENVFILE, DOTENV_PATH
/// - Falls back to .envfile, then default .env discovery
///
/// Returns a description of where the environment was loaded from.
pub fn init_tracing() -> String {
    let env_source = load_env_file();

    // RUST_LOG may come from the env file loaded above.
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
    env_source
}

fn load_env_file() -> String {
    for key in ["ENV_FILE", "ENVFILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty() && Path::new(p).is_file() && dotenvy::from_filename(p).is_ok() {
                return format!("{p} ({key})");
            }
        }
    }

    if Path::new(".envfile").is_file() && dotenvy::from_filename(".envfile").is_ok() {
        return ".envfile".into();
    }

    match dotenvy::dotenv() {
        Ok(path) => path.display().to_string(),
        Err(_) => "none".into(),
    }
}

/// Build the upstream HTTP client.
///
/// The optional `http_timeout` bounds each attempt; the retry loop sees an expired
/// deadline as a transport error.
pub fn build_http_client(config: &AppConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.http_timeout {
        builder = builder.timeout(timeout);
    }

    // User-Agent for observability
    builder = builder.user_agent(format!("rewrite-proxy/{}", env!("CARGO_PKG_VERSION")));

    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

/// Build a CORS layer from configuration. Unset lists are permissive (Any).
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let mut layer = CorsLayer::new();

    let origins: Vec<http::HeaderValue> = list_or_empty(&settings.allowed_origins)
        .filter_map(|o| http::HeaderValue::from_str(o).ok())
        .collect();
    let mut any_wildcard = origins.is_empty();
    layer = if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    };

    let methods: Vec<http::Method> = list_or_empty(&settings.allowed_methods)
        .filter_map(|m| http::Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
        .collect();
    any_wildcard |= methods.is_empty();
    layer = if methods.is_empty() {
        layer.allow_methods(Any)
    } else {
        layer.allow_methods(AllowMethods::list(methods))
    };

    let headers: Vec<http::HeaderName> = list_or_empty(&settings.allowed_headers)
        .filter_map(|h| http::HeaderName::try_from(h.as_str()).ok())
        .collect();
    any_wildcard |= headers.is_empty();
    layer = if headers.is_empty() {
        layer.allow_headers(Any)
    } else {
        layer.allow_headers(AllowHeaders::list(headers))
    };

    // Credentials cannot be combined with wildcards.
    if settings.allow_credentials {
        if any_wildcard {
            tracing::warn!(
                "CORS_ALLOW_CREDENTIALS ignored: origins, methods and headers must all be explicit"
            );
        } else {
            layer = layer.allow_credentials(true);
        }
    }

    if let Some(max_age) = settings.max_age {
        layer = layer.max_age(max_age);
    }

    layer
}

fn list_or_empty(list: &Option<Vec<String>>) -> impl Iterator<Item = &String> {
    list.iter().flatten()
}
