mod config;
mod session;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use dadwall_core::generator::GeneratorClient;
use dadwall_core::quota::UserJokeCounters;
use serde::Deserialize;
use std::future::IntoFuture;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Shared handles every session needs.
pub struct AppState {
    pub config: Config,
    pub counters: Arc<UserJokeCounters>,
    pub generator: Arc<GeneratorClient>,
}

/// The cloud's webhook request to start a TPA session for a connected user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
    pub user_id: String,
    /// Per-session WebSocket endpoint; falls back to the configured one.
    #[serde(default)]
    pub augment_os_websocket_url: Option<String>,
}

async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Json<serde_json::Value> {
    info!(
        "New session: {} for user {}",
        request.session_id, request.user_id
    );
    tokio::spawn(session::run(state, request));
    Json(serde_json::json!({ "status": "ok" }))
}

async fn health_handler() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    info!(
        "Configuration loaded successfully. Starting {}...",
        config.package_name
    );

    let state = Arc::new(AppState {
        counters: Arc::new(UserJokeCounters::new()),
        generator: Arc::new(GeneratorClient::new(
            config.openai_api_key.clone(),
            config.joke_model.clone(),
        )),
        config,
    });

    let app = Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.port);

    // A listener that fails to come up is logged; the process is not forced
    // to exit non-zero.
    match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!("Starting TPA server, listening on {}", addr);
            tokio::select! {
                result = axum::serve(listener, app).into_future() => {
                    if let Err(e) = result {
                        error!("Failed to start server: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down...");
                }
            }
        }
        Err(e) => {
            error!("Failed to start server: {}", e);
        }
    }

    Ok(())
}
