//! Loan Default Risk Service Library
//!
//! Turns raw loan applications into the feature vector a pre-trained
//! classifier expects, predicts default risk and keeps an append-only log of
//! every prediction.

pub mod config;
pub mod consumer;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prediction_log;
pub mod producer;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use error::{ErrorKind, PredictionError};
pub use pipeline::PredictionPipeline;
pub use prediction_log::PredictionLog;
pub use producer::PredictionProducer;
pub use types::{DefaultLabel, LoanApplication, PredictionRecord, PredictionResult};
