//! Integration test: NATS message handling without a broker

use loan_risk_service::consumer::handle_payload;
use loan_risk_service::error::{ErrorKind, ModelError};
use loan_risk_service::features::assembler::SCALED_FEATURE_COUNT;
use loan_risk_service::models::{Classifier, ScaledFeatures, StandardScaler};
use loan_risk_service::producer::PredictionOutcome;
use loan_risk_service::{DefaultLabel, LoanApplication, PredictionLog, PredictionPipeline};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

struct AlwaysDefault;

impl Classifier for AlwaysDefault {
    fn predict(&self, _features: &ScaledFeatures) -> Result<i64, ModelError> {
        Ok(1)
    }

    fn name(&self) -> &str {
        "always-default"
    }
}

fn test_pipeline(dir: &TempDir) -> PredictionPipeline {
    let scaler =
        StandardScaler::from_params(&[0.0; SCALED_FEATURE_COUNT], &[1.0; SCALED_FEATURE_COUNT]).unwrap();
    let log = PredictionLog::open(dir.path().join("predicted.csv")).unwrap();
    PredictionPipeline::new(Arc::new(scaler), Arc::new(AlwaysDefault), Arc::new(log))
}

fn sample_application() -> LoanApplication {
    LoanApplication {
        age: 52,
        income: 88000.0,
        loan_amount: 30000.0,
        credit_score: 640,
        months_employed: 120,
        num_credit_lines: 2,
        interest_rate: 12.0,
        loan_term: 60,
        dti_ratio: 0.45,
        education: "Master's".to_string(),
        employment_type: "Self-employed".to_string(),
        marital_status: "Divorced".to_string(),
        has_mortgage: true,
        has_dependents: true,
        loan_purpose: "Home".to_string(),
        has_co_signer: true,
    }
}

#[test]
fn test_serialized_application_is_accepted() {
    let dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&dir);

    let payload = serde_json::to_vec(&sample_application()).unwrap();
    let outcome = handle_payload(&pipeline, &payload);

    match outcome {
        PredictionOutcome::Success(result) => {
            assert_eq!(result.label, DefaultLabel::Default);
            let records = pipeline.log().read_all().unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].application, sample_application());
            assert_eq!(records[0].loan_id, result.loan_id);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[test]
fn test_invalid_payload_is_reported() {
    let dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&dir);

    match handle_payload(&pipeline, b"not json") {
        PredictionOutcome::Failure { error } => assert_eq!(error.kind, ErrorKind::Validation),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(pipeline.log().is_empty().unwrap());
}

#[test]
fn test_rejected_application_reply() {
    let dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&dir);

    let mut application = serde_json::to_value(sample_application()).unwrap();
    application["InterestRate"] = json!(0.0);
    let payload = serde_json::to_vec(&application).unwrap();

    let outcome = handle_payload(&pipeline, &payload);
    assert_eq!(
        serde_json::to_value(&outcome).unwrap()["error"]["kind"],
        "arithmetic"
    );
    assert!(pipeline.log().is_empty().unwrap());
}
