//! Loan Risk Service - Main Entry Point
//!
//! Loads the scaler and classifier once, opens the prediction log and serves
//! predictions over HTTP and, when enabled, NATS.

use anyhow::Result;
use loan_risk_service::{
    config::{AppConfig, ScalerFormat, DEFAULT_CONFIG_PATH},
    consumer::ApplicationConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::{Classifier, FeatureScaler, ModelLoader, OnnxClassifier, OnnxScaler, StandardScaler},
    pipeline::PredictionPipeline,
    prediction_log::PredictionLog,
    producer::PredictionProducer,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_logging(&config)?;

    info!("Starting Loan Risk Service");
    info!(
        config = config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH),
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // Load model artifacts once; they are read-only from here on
    let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
    let scaler: Arc<dyn FeatureScaler> = match config.models.scaler_format {
        ScalerFormat::Json => Arc::new(StandardScaler::load(&config.models.scaler_path)?),
        ScalerFormat::Onnx => Arc::new(OnnxScaler::load(&loader, &config.models.scaler_path)?),
    };
    let classifier: Arc<dyn Classifier> = Arc::new(OnnxClassifier::load(
        &loader,
        &config.models.classifier_path,
        config.models.decision_threshold,
    )?);

    let log = Arc::new(PredictionLog::open(&config.prediction_log.path)?);
    info!(
        path = %log.path().display(),
        existing_rows = log.len()?,
        "Prediction log ready"
    );

    let mut pipeline = PredictionPipeline::new(scaler, classifier, log).with_metrics(metrics.clone());
    if let Some(budget) = config.models.inference_budget() {
        info!(budget_ms = budget.as_millis() as u64, "Inference budget enabled");
        pipeline = pipeline.with_inference_budget(budget);
    }
    let pipeline = Arc::new(pipeline);

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let interval = config.pipeline.metrics_interval_secs;
    tokio::spawn(async move {
        MetricsReporter::new(metrics_clone, interval).start().await;
    });

    if config.nats.enabled {
        let client = async_nats::connect(&config.nats.url).await?;
        info!("Connected to NATS at {}", config.nats.url);

        let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
        let producer = Arc::new(PredictionProducer::new(client, &config.nats.prediction_subject));
        let pipeline = pipeline.clone();
        let workers = config.pipeline.workers;

        info!(
            workers = workers,
            applications = %consumer.subject(),
            predictions = %producer.subject(),
            "Starting NATS application consumer"
        );

        tokio::spawn(async move {
            if let Err(e) = consumer.run(pipeline, producer, workers).await {
                error!(error = %e, "NATS consumer stopped");
            }
        });
    }

    let state = Arc::new(AppState::new(pipeline));
    let result = server::run_server(state, &config.bind_address()).await;

    info!("Service shutting down...");
    metrics.print_summary();

    result
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("loan_risk_service={},tower_http=info", config.logging.level))
    })?;

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
