//! API Server Module
//!
//! Router construction and the listening server.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::handlers::{assistant_health, health_check, process_query, ApiState};
use crate::models::ApiConfig;

/// Build the application router
pub fn create_router(state: Arc<ApiState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/k8s/query", post(process_query))
        .route("/api/k8s/health", get(assistant_health))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        // The UI is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Main API server
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<ApiState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: Arc<ApiState>) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` is cancelled, then drain in-flight requests
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let app = create_router(self.state.clone(), self.config.max_body_bytes);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        info!("kubeassist API listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| anyhow::anyhow!("API server failed: {}", e))?;

        info!("kubeassist API stopped");
        Ok(())
    }
}
