//! Model artifacts: loading, scaling and classification

pub mod inference;
pub mod loader;
pub mod scaler;

pub use inference::{Classifier, InferenceAdapter, OnnxClassifier};
pub use loader::ModelLoader;
pub use scaler::{FeatureScaler, OnnxScaler, ScaledFeatures, ScalingAdapter, StandardScaler};
