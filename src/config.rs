//! Configuration management for the loan risk service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `LOAN_RISK__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "LOAN_RISK";

/// Storage format of the fitted scaler
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScalerFormat {
    /// JSON file with `mean` and `scale` arrays
    #[default]
    Json,
    /// ONNX graph
    Onnx,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub prediction_log: PredictionLogConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// ONNX classifier graph
    pub classifier_path: String,
    /// Fitted scaler artifact
    pub scaler_path: String,
    #[serde(default)]
    pub scaler_format: ScalerFormat,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Probability at or above which a loan is labelled "Default" when the
    /// classifier only exposes probabilities
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    /// Budget for scaling plus inference; 0 disables the check
    #[serde(default)]
    pub inference_timeout_ms: u64,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_decision_threshold() -> f64 {
    0.5
}

impl ModelsConfig {
    pub fn inference_budget(&self) -> Option<Duration> {
        (self.inference_timeout_ms > 0).then(|| Duration::from_millis(self.inference_timeout_ms))
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier_path: "models/best_rf.onnx".to_string(),
            scaler_path: "models/scaler.json".to_string(),
            scaler_format: ScalerFormat::Json,
            onnx_threads: default_onnx_threads(),
            decision_threshold: default_decision_threshold(),
            inference_timeout_ms: 0,
        }
    }
}

/// Prediction log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionLogConfig {
    /// CSV file holding every accepted prediction
    pub path: String,
}

impl Default for PredictionLogConfig {
    fn default() -> Self {
        Self {
            path: "data/predicted.csv".to_string(),
        }
    }
}

/// NATS front-end configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// Consume applications from NATS in addition to HTTP
    pub enabled: bool,
    /// NATS server URL
    pub url: String,
    /// Subject for incoming loan applications
    pub application_subject: String,
    /// Subject for prediction outcomes when a message has no reply subject
    pub prediction_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "nats://localhost:4222".to_string(),
            application_subject: "loans.applications".to_string(),
            prediction_subject: "loans.predictions".to_string(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum concurrently processed NATS messages
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, then apply environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelsConfig::default(),
            prediction_log: PredictionLogConfig::default(),
            nats: NatsConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.prediction_log.path, "data/predicted.csv");
        assert_eq!(config.models.scaler_format, ScalerFormat::Json);
        assert_eq!(config.models.decision_threshold, 0.5);
        assert_eq!(config.models.inference_budget(), None);
        assert!(!config.nats.enabled);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 8080

[models]
classifier_path = "artifacts/rf.onnx"
scaler_path = "artifacts/scaler.onnx"
scaler_format = "onnx"
inference_timeout_ms = 250

[prediction_log]
path = "/var/lib/loans/predicted.csv"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.models.scaler_format, ScalerFormat::Onnx);
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.models.inference_budget(), Some(Duration::from_millis(250)));
        assert_eq!(config.prediction_log.path, "/var/lib/loans/predicted.csv");
        // Sections absent from the file fall back to defaults
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.logging.format, "pretty");
    }
}
