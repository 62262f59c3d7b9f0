//! Application startup and lifecycle management.
//!
//! Wires configuration, secrets and upstream clients into the axum router and
//! runs the HTTP server until a shutdown signal arrives.

use crate::config::RelayConfig;
use crate::handlers::{generate, google_key_status, health_check, modelscope_key_status};
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::modelscope::{ModelScopeConfig, ModelScopeProvider};
use crate::services::providers::{ImageTaskProvider, MultimodalProvider, ProviderError};
use crate::services::{EnvSecretStore, KeySelector, RandomKeySelector, SecretStore};
use axum::{
    body::Body,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    http_request_span, panic_response, permissive_cors_middleware, request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Shared application state. Everything in here is read-only.
#[derive(Clone)]
pub struct AppState {
    pub secrets: Arc<dyn SecretStore>,
    pub key_selector: Arc<dyn KeySelector>,
    pub gemini: Arc<dyn MultimodalProvider>,
    pub modelscope: Arc<dyn ImageTaskProvider>,
}

impl AppState {
    /// Production wiring: environment secrets, random key selection, real upstreams.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ProviderError> {
        let gemini = GeminiProvider::new(GeminiConfig {
            api_base: config.gemini.api_base.clone(),
            request_timeout: config.upstream_timeout(),
        })?;

        let modelscope = ModelScopeProvider::new(ModelScopeConfig {
            api_base: config.modelscope.api_base.clone(),
            request_timeout: config.upstream_timeout(),
            poll_interval: config.poll_interval(),
            poll_jitter: config.poll_jitter(),
        })?;

        tracing::info!(
            gemini_api_base = %config.gemini.api_base,
            modelscope_api_base = %config.modelscope.api_base,
            poll_interval_ms = config.modelscope.poll_interval_ms,
            "Initialized upstream providers"
        );

        Ok(Self {
            secrets: Arc::new(EnvSecretStore),
            key_selector: Arc::new(RandomKeySelector),
            gemini: Arc::new(gemini),
            modelscope: Arc::new(modelscope),
        })
    }
}

/// Build the relay router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/api/key-status", get(google_key_status))
        .route("/api/modelscope-key-status", get(modelscope_key_status))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        // Outermost, so preflights never reach routing or body parsing.
        .layer(from_fn(permissive_cors_middleware))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).map_err(|e| {
            tracing::error!("Failed to initialize providers: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;
        Self::build_with_state(&config, state).await
    }

    /// Build around an already assembled state (custom secret stores, fakes).
    pub async fn build_with_state(config: &RelayConfig, state: AppState) -> Result<Self, AppError> {
        let host: std::net::IpAddr = config.common.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid listen host '{}': {}",
                config.common.host,
                e
            ))
        })?;

        // Port 0 = random port for testing
        let addr = SocketAddr::new(host, config.common.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("GenAI relay listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
