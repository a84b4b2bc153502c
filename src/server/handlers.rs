//! Request handlers

use super::error::{ApiError, Result};
use super::form::LoanForm;
use super::AppState;
use crate::metrics::MetricsSnapshot;
use crate::types::prediction::PredictionResult;
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    Form, Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Predict from a JSON body with canonical field names.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(fields) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    run_prediction(state, fields).await
}

/// Predict from a form-encoded body with the HTML form's field names.
pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Form<LoanForm>, FormRejection>,
) -> Result<Json<PredictionResult>> {
    let Form(form) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    run_prediction(state, form.into_fields()).await
}

async fn run_prediction(state: Arc<AppState>, fields: Map<String, Value>) -> Result<Json<PredictionResult>> {
    let pipeline = state.pipeline.clone();

    // The pipeline does blocking file and model I/O
    let result = tokio::task::spawn_blocking(move || pipeline.predict(&fields))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))??;

    Ok(Json(result))
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}
