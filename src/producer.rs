//! NATS message producer for prediction outcomes

use crate::error::{ErrorReport, PredictionError};
use crate::types::prediction::PredictionResult;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Payload published for every consumed application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Success(PredictionResult),
    Failure { error: ErrorReport },
}

impl From<std::result::Result<PredictionResult, PredictionError>> for PredictionOutcome {
    fn from(result: std::result::Result<PredictionResult, PredictionError>) -> Self {
        match result {
            Ok(prediction) => PredictionOutcome::Success(prediction),
            Err(e) => PredictionOutcome::Failure {
                error: ErrorReport::from(&e),
            },
        }
    }
}

/// Producer for publishing prediction outcomes to NATS
#[derive(Clone)]
pub struct PredictionProducer {
    client: Client,
    subject: String,
}

impl PredictionProducer {
    /// Create a new prediction producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish an outcome to `reply` when the requester asked for one,
    /// otherwise to the default prediction subject
    pub async fn publish(&self, reply: Option<Subject>, outcome: &PredictionOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome)?;

        match reply {
            Some(reply) => {
                debug!(subject = %reply, "Replying with prediction outcome");
                self.client.publish(reply, payload.into()).await?;
            }
            None => {
                self.client
                    .publish(self.subject.clone(), payload.into())
                    .await?;
            }
        }

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::prediction::DefaultLabel;

    #[test]
    fn test_outcome_payloads() {
        let ok = PredictionOutcome::from(Ok(PredictionResult {
            label: DefaultLabel::Default,
            loan_id: "0f0f0f0f".to_string(),
        }));
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"prediction":"Default","loan_id":"0f0f0f0f"}"#
        );

        let failed = PredictionOutcome::from(Err(ValidationError::MissingField("Age").into()));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({
                "error": { "kind": "validation", "message": "missing required field `Age`" }
            })
        );
    }
}
