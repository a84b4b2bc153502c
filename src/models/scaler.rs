//! Scaling of the numeric feature block with a pre-fitted scaler.

use crate::error::ModelError;
use crate::features::assembler::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES, SCALED_FEATURE_COUNT};
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A fitted transform over the numeric feature block.
///
/// Implementations must be deterministic and must not mutate observable
/// state; one instance is shared by every request.
pub trait FeatureScaler: Send + Sync {
    fn transform(
        &self,
        numeric: &[f64; SCALED_FEATURE_COUNT],
    ) -> std::result::Result<[f64; SCALED_FEATURE_COUNT], ModelError>;

    fn name(&self) -> &str;
}

/// Fitted standardization parameters as exported by the training pipeline.
#[derive(Debug, Deserialize)]
struct StandardScalerArtifact {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

/// Z-score scaler: `(x - mean) / scale` per feature.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: [f64; SCALED_FEATURE_COUNT],
    scale: [f64; SCALED_FEATURE_COUNT],
}

impl StandardScaler {
    /// Build a scaler from fitted means and scales.
    pub fn from_params(mean: &[f64], scale: &[f64]) -> Result<Self> {
        if mean.len() != SCALED_FEATURE_COUNT || scale.len() != SCALED_FEATURE_COUNT {
            anyhow::bail!(
                "Scaler expects {} means and scales, got {} and {}",
                SCALED_FEATURE_COUNT,
                mean.len(),
                scale.len()
            );
        }
        if let Some(i) = scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            anyhow::bail!("Scale for {} must be finite and non-zero", FEATURE_NAMES[i]);
        }
        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            anyhow::bail!("Mean for {} must be finite", FEATURE_NAMES[i]);
        }

        let mut scaler = Self {
            mean: [0.0; SCALED_FEATURE_COUNT],
            scale: [1.0; SCALED_FEATURE_COUNT],
        };
        scaler.mean.copy_from_slice(mean);
        scaler.scale.copy_from_slice(scale);
        Ok(scaler)
    }

    /// Load fitted parameters from a JSON artifact.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read scaler from {:?}", path))?;
        let artifact: StandardScalerArtifact =
            serde_json::from_str(&raw).context("Failed to parse scaler artifact")?;

        if let Some(names) = &artifact.feature_names {
            let expected = &FEATURE_NAMES[..SCALED_FEATURE_COUNT];
            if names.iter().map(|s| s.as_str()).ne(expected.iter().copied()) {
                anyhow::bail!(
                    "Scaler was fitted on {:?}, expected {:?}",
                    names,
                    expected
                );
            }
        }

        let scaler = Self::from_params(&artifact.mean, &artifact.scale)?;
        info!(path = %path.display(), "Standard scaler loaded");
        Ok(scaler)
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(
        &self,
        numeric: &[f64; SCALED_FEATURE_COUNT],
    ) -> std::result::Result<[f64; SCALED_FEATURE_COUNT], ModelError> {
        let mut out = [0.0; SCALED_FEATURE_COUNT];
        for (i, value) in numeric.iter().enumerate() {
            out[i] = (value - self.mean[i]) / self.scale[i];
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Scaler exported as an ONNX graph with an `[N, 11]` float input.
pub struct OnnxScaler {
    model: Mutex<LoadedModel>,
}

impl OnnxScaler {
    pub fn load<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> Result<Self> {
        let model = loader.load_model(path, "scaler")?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn run(
        model: &mut LoadedModel,
        numeric: &[f64; SCALED_FEATURE_COUNT],
    ) -> std::result::Result<[f64; SCALED_FEATURE_COUNT], ModelError> {
        use ort::value::Tensor;

        let input: Vec<f32> = numeric.iter().map(|v| *v as f32).collect();
        let shape = vec![1_i64, SCALED_FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, input))
            .map_err(|e| ModelError::Scaler(format!("failed to create input tensor: {}", e)))?;

        let output_name = model.output_names[0].clone();
        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])
            .map_err(|e| ModelError::Scaler(e.to_string()))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| ModelError::Scaler(format!("missing output {}", output_name)))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Scaler(e.to_string()))?;

        if data.len() != SCALED_FEATURE_COUNT {
            return Err(ModelError::Scaler(format!(
                "expected {} outputs, got {}",
                SCALED_FEATURE_COUNT,
                data.len()
            )));
        }

        let mut out = [0.0; SCALED_FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(data) {
            *slot = *value as f64;
        }
        Ok(out)
    }
}

impl FeatureScaler for OnnxScaler {
    fn transform(
        &self,
        numeric: &[f64; SCALED_FEATURE_COUNT],
    ) -> std::result::Result<[f64; SCALED_FEATURE_COUNT], ModelError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| ModelError::Scaler(format!("lock error: {}", e)))?;
        Self::run(&mut model, numeric)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Model input after scaling. Only the scaling adapter can produce one, so
/// the classifier can never see unscaled features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledFeatures([f64; FEATURE_COUNT]);

impl ScaledFeatures {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Single-precision copy for ONNX input tensors.
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|v| *v as f32).collect()
    }
}

/// Applies the shared scaler to the numeric block of a feature vector.
#[derive(Clone)]
pub struct ScalingAdapter {
    scaler: Arc<dyn FeatureScaler>,
}

impl ScalingAdapter {
    pub fn new(scaler: Arc<dyn FeatureScaler>) -> Self {
        Self { scaler }
    }

    pub fn scaler_name(&self) -> &str {
        self.scaler.name()
    }

    /// Scale the first 11 features, leaving the passthrough block untouched.
    pub fn scale(&self, features: &FeatureVector) -> std::result::Result<ScaledFeatures, ModelError> {
        let scaled = self.scaler.transform(&features.numeric())?;

        if let Some(i) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::Scaler(format!(
                "scaled {} is not finite",
                FEATURE_NAMES[i]
            )));
        }

        let merged = features.with_numeric(scaled);
        debug!(scaler = self.scaler.name(), "Scaled numeric features");
        Ok(ScaledFeatures(*merged.values()))
    }
}
