//! Type definitions for the loan risk service

pub mod application;
pub mod prediction;

pub use application::{field, LoanApplication, APPLICATION_FIELDS};
pub use prediction::{DefaultLabel, PredictionRecord, PredictionResult, LOG_COLUMNS};
