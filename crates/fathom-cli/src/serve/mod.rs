//! HTTP API for research runs and stored reports.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - API request/response types (DTOs)

mod handlers;
mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use color_eyre::eyre::{Result, WrapErr};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use fathom_core::config::ServerConfig;
use fathom_core::ResearchService;

/// Shared application state for the server.
pub struct AppState {
    pub service: Arc<ResearchService>,
}

pub fn router(service: Arc<ResearchService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/api/research", post(handlers::research))
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/{id}", get(handlers::get_report))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serves the API until Ctrl+C.
pub async fn start_server(service: Arc<ResearchService>, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!(addr = %addr, "Research API listening");
    println!("Fathom API running on http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
