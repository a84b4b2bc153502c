//! NATS consumer for incoming loan applications

use crate::error::{ErrorKind, ErrorReport};
use crate::pipeline::PredictionPipeline;
use crate::producer::{PredictionOutcome, PredictionProducer};
use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Consumer for receiving loan applications from NATS
pub struct ApplicationConsumer {
    client: Client,
    subject: String,
}

impl ApplicationConsumer {
    /// Create a new application consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the application subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to application subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Process applications until the subscription ends, at most `workers`
    /// at a time
    pub async fn run(
        &self,
        pipeline: Arc<PredictionPipeline>,
        producer: Arc<PredictionProducer>,
        workers: usize,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut subscription = self.subscribe().await?;

        while let Some(message) = subscription.next().await {
            let permit = semaphore.clone().acquire_owned().await?;

            let pipeline = pipeline.clone();
            let producer = producer.clone();

            tokio::spawn(async move {
                let payload = message.payload.to_vec();
                let outcome = match tokio::task::spawn_blocking(move || handle_payload(&pipeline, &payload)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(error = %e, "Prediction task failed");
                        PredictionOutcome::Failure {
                            error: ErrorReport::new(ErrorKind::Model, "An internal error occurred"),
                        }
                    }
                };

                if let Err(e) = producer.publish(message.reply.clone(), &outcome).await {
                    error!(error = %e, "Failed to publish prediction outcome");
                }

                drop(permit);
            });
        }

        info!(subject = %self.subject, "Application subscription closed");
        Ok(())
    }
}

/// Run one JSON-encoded application through the pipeline
pub fn handle_payload(pipeline: &PredictionPipeline, payload: &[u8]) -> PredictionOutcome {
    match serde_json::from_slice::<Map<String, Value>>(payload) {
        Ok(fields) => PredictionOutcome::from(pipeline.predict(&fields)),
        Err(e) => {
            warn!(error = %e, "Failed to deserialize loan application");
            PredictionOutcome::Failure {
                error: ErrorReport::new(ErrorKind::Validation, format!("invalid JSON payload: {}", e)),
            }
        }
    }
}
