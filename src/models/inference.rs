//! Classifier inference over scaled feature vectors

use crate::error::ModelError;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::scaler::ScaledFeatures;
use crate::types::prediction::DefaultLabel;
use anyhow::Result;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A fitted binary classifier. Returns the predicted class index.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &ScaledFeatures) -> std::result::Result<i64, ModelError>;

    fn name(&self) -> &str;
}

/// Binary classifier backed by an ONNX Runtime session.
///
/// Uses the graph's `label` output when present, otherwise thresholds the
/// positive-class probability.
pub struct OnnxClassifier {
    model: Mutex<LoadedModel>,
    label_output: Option<String>,
    probability_output: Option<String>,
    threshold: f64,
}

impl OnnxClassifier {
    /// Load the classifier graph from file
    pub fn load<P: AsRef<Path>>(loader: &ModelLoader, path: P, threshold: f64) -> Result<Self> {
        let model = loader.load_model(path, "classifier")?;

        let (label_output, probability_output) = select_outputs(&model.output_names);

        if label_output.is_none() && probability_output.is_none() {
            anyhow::bail!(
                "Classifier exposes neither a label nor a probability output: {:?}",
                model.output_names
            );
        }

        info!(
            label_output = ?label_output,
            probability_output = ?probability_output,
            threshold = threshold,
            "ONNX classifier ready"
        );

        Ok(Self {
            model: Mutex::new(model),
            label_output,
            probability_output,
            threshold,
        })
    }

    /// Run the session once and read the predicted class
    fn run_model(&self, model: &mut LoadedModel, features: &[f32]) -> std::result::Result<i64, ModelError> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| ModelError::Classifier(format!("failed to create input tensor: {}", e)))?;

        let model_name = model.name.clone();

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])
            .map_err(|e| ModelError::Classifier(e.to_string()))?;

        if let Some(name) = &self.label_output {
            if let Some(output) = outputs.get(name) {
                if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                    if let Some(label) = data.first() {
                        debug!(model = %model_name, label = *label, "Extracted label");
                        return Ok(*label);
                    }
                }
            }
        }

        let name = self.probability_output.as_deref().ok_or_else(|| {
            ModelError::Classifier("label output unreadable and no probability output".to_string())
        })?;
        let output = outputs
            .get(name)
            .ok_or_else(|| ModelError::Classifier(format!("missing output {}", name)))?;

        let prob = Self::extract_probability(output, &model_name)?;
        Ok(if prob >= self.threshold { 1 } else { 0 })
    }

    /// Extract default probability from either a tensor or a seq(map) output
    fn extract_probability(
        output: &ort::value::DynValue,
        model_name: &str,
    ) -> std::result::Result<f64, ModelError> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = Self::positive_prob_from_tensor(shape, data)?;
            debug!(model = %model_name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return Self::extract_from_sequence_map(output, model_name);
        }

        Err(ModelError::Classifier(format!(
            "unsupported probability output type {:?}",
            output.dtype()
        )))
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(
        output: &ort::value::DynValue,
        model_name: &str,
    ) -> std::result::Result<f64, ModelError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ModelError::Classifier(format!("failed to downcast to sequence: {}", e)))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| ModelError::Classifier(e.to_string()))?;

        // batch_size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| ModelError::Classifier("empty probability sequence".to_string()))?;

        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| ModelError::Classifier(e.to_string()))?;

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            debug!(model = %model_name, prob = *prob, "Extracted from seq(map)");
            return Ok(*prob as f64);
        }
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(ModelError::Classifier("no class probability in map".to_string()))
    }

    /// Positive-class probability from a `[batch, classes]` or `[classes]` tensor
    fn positive_prob_from_tensor(
        shape: &ort::tensor::Shape,
        data: &[f32],
    ) -> std::result::Result<f64, ModelError> {
        let classes = shape.last().copied().unwrap_or(0);
        match (classes, data) {
            (c, [_, positive, ..]) if c >= 2 => Ok(*positive as f64),
            (1, [prob, ..]) => Ok(*prob as f64),
            _ => Err(ModelError::Classifier(format!(
                "unexpected probability tensor of {} values",
                data.len()
            ))),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &ScaledFeatures) -> std::result::Result<i64, ModelError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| ModelError::Classifier(format!("lock error: {}", e)))?;
        self.run_model(&mut model, &features.to_f32())
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Pick the label and probability outputs by name.
///
/// sklearn graphs expose `label`/`probabilities`, LightGBM ones
/// `output_label`/`output_probability`. A bare `output` is only taken as the
/// probability when nothing mentions `prob` and it is not the label output.
fn select_outputs(names: &[String]) -> (Option<String>, Option<String>) {
    let find = |needle: &str, exclude: Option<&str>| {
        names
            .iter()
            .find(|name| name.contains(needle) && Some(name.as_str()) != exclude)
            .cloned()
    };

    let label = find("label", None);
    let probability = find("prob", label.as_deref()).or_else(|| find("output", label.as_deref()));
    (label, probability)
}

/// Runs the shared classifier and maps its class to a label.
#[derive(Clone)]
pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
}

impl InferenceAdapter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Predict the label for an already scaled feature vector.
    pub fn infer(&self, features: &ScaledFeatures) -> std::result::Result<DefaultLabel, ModelError> {
        let class = self.classifier.predict(features)?;
        DefaultLabel::from_class(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::assembler::{FeatureVector, FEATURE_COUNT, SCALED_FEATURE_COUNT};
    use crate::models::scaler::{ScalingAdapter, StandardScaler};

    struct FixedClass(i64);

    impl Classifier for FixedClass {
        fn predict(&self, _features: &ScaledFeatures) -> std::result::Result<i64, ModelError> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn scaled() -> ScaledFeatures {
        let identity = StandardScaler::from_params(
            &[0.0; SCALED_FEATURE_COUNT],
            &[1.0; SCALED_FEATURE_COUNT],
        )
        .unwrap();
        ScalingAdapter::new(Arc::new(identity))
            .scale(&FeatureVector::from_values([1.0; FEATURE_COUNT]))
            .unwrap()
    }

    #[test]
    fn test_label_mapping() {
        let adapter = InferenceAdapter::new(Arc::new(FixedClass(1)));
        assert_eq!(adapter.infer(&scaled()).unwrap(), DefaultLabel::Default);

        let adapter = InferenceAdapter::new(Arc::new(FixedClass(0)));
        assert_eq!(adapter.infer(&scaled()).unwrap(), DefaultLabel::NoDefault);
        assert_eq!(adapter.classifier_name(), "fixed");
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_output_selection() {
        let (label, prob) = select_outputs(&names(&["output_label", "output_probability"]));
        assert_eq!(label.as_deref(), Some("output_label"));
        assert_eq!(prob.as_deref(), Some("output_probability"));

        let (label, prob) = select_outputs(&names(&["label", "probabilities"]));
        assert_eq!(label.as_deref(), Some("label"));
        assert_eq!(prob.as_deref(), Some("probabilities"));

        let (label, prob) = select_outputs(&names(&["output"]));
        assert_eq!(label, None);
        assert_eq!(prob.as_deref(), Some("output"));

        let (label, prob) = select_outputs(&names(&["output_label"]));
        assert_eq!(label.as_deref(), Some("output_label"));
        assert_eq!(prob, None);
    }

    #[test]
    fn test_unexpected_class_is_model_error() {
        let adapter = InferenceAdapter::new(Arc::new(FixedClass(3)));
        assert!(matches!(
            adapter.infer(&scaled()),
            Err(ModelError::InvalidLabel(3))
        ));
    }
}
