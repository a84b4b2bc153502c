//! Error responses for the HTTP front-end

use crate::error::{ErrorKind, ErrorReport, PredictionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, report) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorReport::new(ErrorKind::Validation, msg.clone()),
            ),
            ApiError::Prediction(e) => {
                let status = match e.kind() {
                    ErrorKind::Validation | ErrorKind::Arithmetic => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Model | ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, ErrorReport::from(e))
            }
            ApiError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorReport::new(ErrorKind::Model, "An internal error occurred"),
                )
            }
        };

        (status, Json(json!({ "error": report }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
