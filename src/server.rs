use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::error::RewriteError;
use crate::login::{password_matches, supplied_password, LoginOutcome};
use crate::models::rewrite::{RewriteRequest, RewrittenText};
use crate::proxy::RewriteProxy;
use crate::tone::ToneTemplates;
use crate::transport::HttpTransport;
use crate::util::{build_http_client, cors_layer};

pub const ROUTES: [&str; 5] = ["/status", "/rewrite", "/api/rewrite", "/login", "/api/login"];

/// Shared application state used by the HTTP handlers.
pub struct AppState {
    pub proxy: RewriteProxy,
    pub login_password: Option<String>,
}

impl AppState {
    /// Wire the reqwest transport and the rewrite proxy from configuration.
    pub fn from_config(config: &AppConfig, tones: ToneTemplates) -> Self {
        let transport = HttpTransport::new(
            build_http_client(config),
            &config.base_url,
            config.api_key.clone(),
        );
        tracing::info!("Upstream endpoint: {}", transport.endpoint());
        let proxy = RewriteProxy::new(
            Arc::new(transport),
            Arc::new(tones),
            config.completion.clone(),
            config.retry.clone(),
        );
        Self {
            proxy,
            login_password: config.login_password.clone(),
        }
    }
}

/// Build the full application router from configuration.
pub fn build_app(config: &AppConfig, tones: ToneTemplates) -> Router {
    let state = Arc::new(AppState::from_config(config, tones));
    build_router(state).layer(cors_layer(&config.cors))
}

/// Build the Axum router over an existing state (no CORS layer).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/rewrite", post_only(post(rewrite)))
        .route("/api/rewrite", post_only(post(rewrite)))
        .route("/login", post_only(post(login)))
        .route("/api/login", post_only(post(login)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer every non-POST method with the JSON 405 body.
fn post_only(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route.fallback(method_not_allowed)
}

async fn method_not_allowed() -> Response {
    RewriteError::MethodNotAllowed.into_response()
}

/// Service status endpoint exposing the model, tones and available routes.
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "rewrite-proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.proxy.completion().model,
        "tones": state.proxy.tones().names(),
        "login_enabled": state.login_password.is_some(),
        "routes": ROUTES,
    }))
}

/// Rewrite `text` in the requested `tone` via the upstream completion API.
async fn rewrite(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RewrittenText>, RewriteError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("rewrite", %request_id);
    async move {
        let request = RewriteRequest::from_slice(&body).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected rewrite request");
        })?;
        let rewritten = state.proxy.rewrite(&request).await?;
        tracing::info!(
            chars = rewritten.rewritten_text.chars().count(),
            "rewrite completed"
        );
        Ok(Json(rewritten))
    }
    .instrument(span)
    .await
}

/// Compare the submitted password with the configured secret.
async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> LoginOutcome {
    let supplied = supplied_password(&body);
    let success = password_matches(state.login_password.as_deref(), supplied.as_deref());
    if !success {
        tracing::info!("login rejected");
    }
    LoginOutcome { success }
}
