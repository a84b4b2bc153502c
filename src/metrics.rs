//! Performance metrics and outcome counters for the prediction pipeline.

use crate::error::ErrorKind;
use crate::types::prediction::DefaultLabel;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total successful predictions
    pub predictions: AtomicU64,
    /// Predictions labelled "Default"
    pub defaults: AtomicU64,
    /// Total failed requests
    pub failures: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<ErrorKind, u64>>,
    /// End-to-end processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Scaling + classifier times (in microseconds)
    inference_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            defaults: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            inference_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, label: DefaultLabel) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if label == DefaultLabel::Default {
            self.defaults.fetch_add(1, Ordering::Relaxed);
        }
        push_sample(&self.processing_times, processing_time);
    }

    /// Record time spent in the scaler and classifier
    pub fn record_inference_time(&self, duration: Duration) {
        push_sample(&self.inference_times, duration);
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: ErrorKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Get end-to-end processing time statistics
    pub fn get_processing_stats(&self) -> LatencyStats {
        latency_stats(&self.processing_times)
    }

    /// Get scaler + classifier time statistics
    pub fn get_inference_stats(&self) -> LatencyStats {
        latency_stats(&self.inference_times)
    }

    /// Get failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<ErrorKind, u64> {
        self.failures_by_kind
            .read()
            .map(|by_kind| by_kind.clone())
            .unwrap_or_default()
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let defaults = self.defaults.load(Ordering::Relaxed);

        MetricsSnapshot {
            predictions,
            defaults,
            no_defaults: predictions.saturating_sub(defaults),
            failures: self.failures.load(Ordering::Relaxed),
            failures_by_kind: self
                .get_failures_by_kind()
                .into_iter()
                .map(|(kind, count)| (kind.as_str().to_string(), count))
                .collect(),
            throughput: self.get_throughput(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            processing: self.get_processing_stats(),
            inference: self.get_inference_stats(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let default_rate = if snapshot.predictions > 0 {
            (snapshot.defaults as f64 / snapshot.predictions as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              LOAN RISK SERVICE - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions: {:>8}  │  Throughput: {:>6.1} req/s            ║",
            snapshot.predictions, snapshot.throughput
        );
        info!(
            "║ Default:     {:>8}  │  Default Rate: {:>5.1}%               ║",
            snapshot.defaults, default_rate
        );
        info!(
            "║ Failures:    {:>8}                                        ║",
            snapshot.failures
        );
        for (kind, count) in &snapshot.failures_by_kind {
            info!("║   {:12}: {:>6}                                        ║", kind, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}     ║",
            snapshot.processing.mean_us,
            snapshot.processing.p50_us,
            snapshot.processing.p95_us,
            snapshot.processing.p99_us
        );
        info!(
            "║ Inference  (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}     ║",
            snapshot.inference.mean_us,
            snapshot.inference.p50_us,
            snapshot.inference.p95_us,
            snapshot.inference.p99_us
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sample(samples: &RwLock<Vec<u64>>, duration: Duration) {
    if let Ok(mut times) = samples.write() {
        times.push(duration.as_micros() as u64);
        // Keep only the most recent window
        if times.len() > MAX_SAMPLES {
            times.drain(0..MAX_SAMPLES / 2);
        }
    }
}

fn latency_stats(samples: &RwLock<Vec<u64>>) -> LatencyStats {
    let mut sorted: Vec<u64> = match samples.read() {
        Ok(times) if !times.is_empty() => times.clone(),
        _ => return LatencyStats::default(),
    };
    sorted.sort_unstable();

    let sum: u64 = sorted.iter().sum();
    let count = sorted.len();

    LatencyStats {
        count: count as u64,
        mean_us: sum / count as u64,
        p50_us: sorted[count / 2],
        p95_us: sorted[(count as f64 * 0.95) as usize],
        p99_us: sorted[(count as f64 * 0.99) as usize],
        max_us: sorted[count - 1],
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view of the pipeline metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub defaults: u64,
    pub no_defaults: u64,
    pub failures: u64,
    pub failures_by_kind: HashMap<String, u64>,
    pub throughput: f64,
    pub uptime_secs: u64,
    pub processing: LatencyStats,
    pub inference: LatencyStats,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), DefaultLabel::Default);
        metrics.record_prediction(Duration::from_micros(300), DefaultLabel::NoDefault);
        metrics.record_failure(ErrorKind::Validation);
        metrics.record_failure(ErrorKind::Validation);
        metrics.record_failure(ErrorKind::Persistence);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions, 2);
        assert_eq!(snapshot.defaults, 1);
        assert_eq!(snapshot.no_defaults, 1);
        assert_eq!(snapshot.failures, 3);
        assert_eq!(snapshot.failures_by_kind.get("validation"), Some(&2));
        assert_eq!(snapshot.failures_by_kind.get("persistence"), Some(&1));
        assert_eq!(snapshot.processing.count, 2);
        assert_eq!(snapshot.processing.mean_us, 200);
        assert_eq!(snapshot.processing.max_us, 300);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_inference_stats(), LatencyStats::default());
        assert_eq!(metrics.snapshot().failures_by_kind.len(), 0);
    }

    #[test]
    fn test_sample_window_is_bounded() {
        let metrics = PipelineMetrics::new();
        for i in 0..(MAX_SAMPLES as u64 + 10) {
            metrics.record_inference_time(Duration::from_micros(i));
        }
        assert!(metrics.get_inference_stats().count <= MAX_SAMPLES as u64);
    }
}
