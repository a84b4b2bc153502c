//! Error taxonomy for the prediction pipeline.
//!
//! Every stage of a prediction returns one of the four error families below.
//! The pipeline only writes to the prediction log after all of them have been
//! ruled out, so an `Err` always means nothing was recorded.

use serde::Serialize;
use thiserror::Error;

/// Coarse error tag reported to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Arithmetic,
    Model,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Model => "model",
            ErrorKind::Persistence => "persistence",
        }
    }
}

/// Malformed or incomplete application input.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown {field} value `{value}`")]
    UnmappedCategory { field: &'static str, value: String },
}

/// Derived feature could not be computed.
#[derive(Debug, Error, PartialEq)]
pub enum ArithmeticError {
    #[error("cannot compute {feature}: {divisor} is zero")]
    DivisionByZero {
        feature: &'static str,
        divisor: &'static str,
    },

    #[error("{feature} is not a finite number")]
    NonFinite { feature: &'static str },
}

/// Scaler or classifier failure.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("scaler failed: {0}")]
    Scaler(String),

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("classifier returned unsupported label {0}")]
    InvalidLabel(i64),

    #[error("inference took {elapsed_ms} ms, budget is {budget_ms} ms")]
    DeadlineExceeded { elapsed_ms: u128, budget_ms: u128 },
}

/// Prediction log could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("log header {found:?} does not match schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("prediction log lock poisoned")]
    LockPoisoned,
}

/// Any failure of a single prediction request.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PredictionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Validation(_) => ErrorKind::Validation,
            PredictionError::Arithmetic(_) => ErrorKind::Arithmetic,
            PredictionError::Model(_) => ErrorKind::Model,
            PredictionError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictionError>;

/// Error description returned to callers.
///
/// Input problems are reported verbatim; model and storage failures get a
/// generic message and are only detailed in the service logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&PredictionError> for ErrorReport {
    fn from(err: &PredictionError) -> Self {
        let message = match err.kind() {
            ErrorKind::Validation | ErrorKind::Arithmetic => err.to_string(),
            ErrorKind::Model => "Prediction model failed, check server logs".to_string(),
            ErrorKind::Persistence => "Prediction could not be recorded, check server logs".to_string(),
        };
        Self::new(err.kind(), message)
    }
}
