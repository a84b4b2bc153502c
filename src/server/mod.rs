//! HTTP front-end
//!
//! Routes:
//! - `POST /predict` JSON application with canonical field names
//! - `POST /predict/form` form-encoded application
//! - `GET /health`
//! - `GET /metrics`

mod error;
pub mod form;
mod handlers;

pub use error::ApiError;

use crate::pipeline::PredictionPipeline;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<PredictionPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<PredictionPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/predict/form", post(handlers::predict_form))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `address` and serve until the process is stopped
pub async fn run_server(state: Arc<AppState>, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .context(format!("Failed to bind {}", address))?;

    info!(address = %address, "HTTP server listening");

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")
}
