//! Prediction pipeline: raw request in, label and loan id out.
//!
//! Stages run in a fixed order: encode, derive, assemble, scale, classify,
//! log. The log append is the only side effect and happens last, so a request
//! that fails at any earlier stage leaves no trace in the log.

use crate::error::{ErrorKind, ModelError, PredictionError, Result};
use crate::features::{CategoricalEncoder, FeatureAssembler, FeatureEngineer, FeatureVector};
use crate::metrics::PipelineMetrics;
use crate::models::{Classifier, FeatureScaler, InferenceAdapter, ScalingAdapter};
use crate::prediction_log::PredictionLog;
use crate::types::application::LoanApplication;
use crate::types::prediction::{DefaultLabel, PredictionRecord, PredictionResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Length of a generated loan id.
pub const LOAN_ID_LEN: usize = 8;

/// Short random identifier taken from a v4 UUID.
///
/// Collisions are unlikely at the volumes this service handles but are not
/// ruled out.
pub fn new_loan_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..LOAN_ID_LEN].to_string()
}

pub struct PredictionPipeline {
    encoder: CategoricalEncoder,
    engineer: FeatureEngineer,
    assembler: FeatureAssembler,
    scaling: ScalingAdapter,
    inference: InferenceAdapter,
    log: Arc<PredictionLog>,
    metrics: Arc<PipelineMetrics>,
    inference_budget: Option<Duration>,
}

impl PredictionPipeline {
    /// Build a pipeline around already loaded artifacts.
    pub fn new(
        scaler: Arc<dyn FeatureScaler>,
        classifier: Arc<dyn Classifier>,
        log: Arc<PredictionLog>,
    ) -> Self {
        let scaling = ScalingAdapter::new(scaler);
        let inference = InferenceAdapter::new(classifier);

        info!(
            scaler = scaling.scaler_name(),
            classifier = inference.classifier_name(),
            log = %log.path().display(),
            "Prediction pipeline initialized"
        );

        Self {
            encoder: CategoricalEncoder::new(),
            engineer: FeatureEngineer::new(),
            assembler: FeatureAssembler::new(),
            scaling,
            inference,
            log,
            metrics: Arc::new(PipelineMetrics::new()),
            inference_budget: None,
        }
    }

    /// Share an existing metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Fail requests whose scaling plus inference takes longer than `budget`.
    pub fn with_inference_budget(mut self, budget: Duration) -> Self {
        self.inference_budget = Some(budget);
        self
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    /// Predict from a mapping of canonical field names to values.
    pub fn predict(&self, raw: &Map<String, Value>) -> Result<PredictionResult> {
        let start = Instant::now();
        let loan_id = new_loan_id();

        let result = LoanApplication::from_fields(raw)
            .map_err(PredictionError::from)
            .and_then(|application| self.process(application, loan_id.clone()));

        self.observe(&loan_id, start, result)
    }

    fn process(&self, application: LoanApplication, loan_id: String) -> Result<PredictionResult> {
        let categories = self.encoder.encode_all(&application)?;
        let derived = self.engineer.derive(&application)?;
        let features = self.assembler.assemble(&application, &categories, &derived);

        debug!(
            loan_id = %loan_id,
            risk_score = derived.risk_score,
            lti = derived.lti,
            "Features assembled"
        );

        let label = self.classify(&features)?;

        let record = PredictionRecord::new(application, loan_id, label);
        self.log.append(&record)?;

        Ok(PredictionResult {
            label,
            loan_id: record.loan_id,
        })
    }

    fn classify(&self, features: &FeatureVector) -> Result<DefaultLabel> {
        let started = Instant::now();

        let scaled = self.scaling.scale(features)?;
        let label = self.inference.infer(&scaled)?;

        let elapsed = started.elapsed();
        self.metrics.record_inference_time(elapsed);

        if let Some(budget) = self.inference_budget {
            if elapsed > budget {
                return Err(ModelError::DeadlineExceeded {
                    elapsed_ms: elapsed.as_millis(),
                    budget_ms: budget.as_millis(),
                }
                .into());
            }
        }

        Ok(label)
    }

    fn observe(
        &self,
        loan_id: &str,
        start: Instant,
        result: Result<PredictionResult>,
    ) -> Result<PredictionResult> {
        let processing_time = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.metrics.record_prediction(processing_time, prediction.label);
                info!(
                    loan_id = %prediction.loan_id,
                    prediction = %prediction.label,
                    processing_time_us = processing_time.as_micros(),
                    "Prediction recorded"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                match e.kind() {
                    ErrorKind::Validation | ErrorKind::Arithmetic => {
                        warn!(discarded_loan_id = %loan_id, kind = e.kind().as_str(), error = %e, "Prediction rejected");
                    }
                    ErrorKind::Model | ErrorKind::Persistence => {
                        error!(discarded_loan_id = %loan_id, kind = e.kind().as_str(), error = %e, "Prediction failed");
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::assembler::SCALED_FEATURE_COUNT;
    use crate::models::{ScaledFeatures, StandardScaler};
    use serde_json::json;
    use std::thread;
    use tempfile::TempDir;

    struct SlowClassifier(Duration);

    impl Classifier for SlowClassifier {
        fn predict(&self, _features: &ScaledFeatures) -> std::result::Result<i64, ModelError> {
            thread::sleep(self.0);
            Ok(0)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn pipeline(dir: &TempDir, classifier: Arc<dyn Classifier>) -> PredictionPipeline {
        let scaler = StandardScaler::from_params(&[0.0; SCALED_FEATURE_COUNT], &[1.0; SCALED_FEATURE_COUNT]).unwrap();
        let log = PredictionLog::open(dir.path().join("predicted.csv")).unwrap();
        PredictionPipeline::new(Arc::new(scaler), classifier, Arc::new(log))
    }

    fn fields() -> Map<String, Value> {
        json!({
            "Age": 29, "Income": 41000, "LoanAmount": 23000, "CreditScore": 580,
            "MonthsEmployed": 10, "NumCreditLines": 2, "InterestRate": 19.5,
            "LoanTerm": 48, "DTIRatio": 0.62, "Education": "High School",
            "EmploymentType": "Part-time", "MaritalStatus": "Single",
            "LoanPurpose": "Other", "HasMortgage": false, "HasDependents": true,
            "HasCoSigner": false
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_loan_id_format() {
        let id = new_loan_id();
        assert_eq!(id.len(), LOAN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_loan_id(), new_loan_id());
    }

    #[test]
    fn test_deadline_exceeded_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(SlowClassifier(Duration::from_millis(30))))
            .with_inference_budget(Duration::from_millis(1));

        let err = pipeline.predict(&fields()).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Model(ModelError::DeadlineExceeded { .. })
        ));
        assert_eq!(pipeline.log().len().unwrap(), 0);
        assert_eq!(pipeline.metrics().snapshot().failures_by_kind.get("model"), Some(&1));
    }

    #[test]
    fn test_within_budget_succeeds() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, Arc::new(SlowClassifier(Duration::ZERO)))
            .with_inference_budget(Duration::from_secs(5));

        let result = pipeline.predict(&fields()).unwrap();
        assert_eq!(result.label, DefaultLabel::NoDefault);
        assert_eq!(pipeline.log().len().unwrap(), 1);
        assert_eq!(pipeline.metrics().snapshot().predictions, 1);
    }
}
