//! Feature preprocessing matching the training pipeline

pub mod assembler;
pub mod encoder;
pub mod engineer;

pub use assembler::{FeatureAssembler, FeatureVector, FEATURE_NAMES};
pub use encoder::{CategoricalEncoder, CategoricalField, EncodedCategories};
pub use engineer::{DerivedFeatures, FeatureEngineer};
