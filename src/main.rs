use anyhow::Context;
use rewrite_proxy::config::AppConfig;
use rewrite_proxy::server::build_app;
use rewrite_proxy::tone::ToneTemplates;
use rewrite_proxy::util::init_tracing;
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut config = AppConfig::from_env();

    // --tones-config=<path> overrides REWRITE_TONES_CONFIG
    if let Some(path) = args
        .iter()
        .find_map(|a| a.strip_prefix("--tones-config="))
        .map(PathBuf::from)
    {
        config.tones_config = Some(path);
    }

    let tones = match &config.tones_config {
        Some(path) => {
            tracing::info!("Loading tones configuration from: {}", path.display());
            match ToneTemplates::load_from_file(path) {
                Ok(tones) => {
                    tracing::info!("Tones configuration loaded");
                    tones
                }
                Err(e) => {
                    tracing::error!("Failed to load tones config: {:#}", e);
                    tracing::warn!("Continuing with built-in tones");
                    ToneTemplates::default()
                }
            }
        }
        None => {
            tracing::info!("No tones config provided, using built-in tones");
            ToneTemplates::default()
        }
    };

    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; upstream calls will be unauthenticated");
    }
    if config.login_password.is_none() {
        tracing::warn!("LOGIN_PASSWORD is not set; every login attempt will be rejected");
    }
    tracing::info!(
        "Model: {} (max_tokens={}), retry: {} attempts, {:?} delay, transport retries {}",
        config.completion.model,
        config.completion.max_tokens,
        config.retry.max_attempts(),
        config.retry.delay_for(1),
        if config.retry.retries_transport_errors() {
            "on"
        } else {
            "off"
        }
    );

    let app = build_app(&config, tones);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Rewrite proxy listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
