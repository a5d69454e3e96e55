//! Forward-pass latency benchmark
//!
//! Times the grasp network on random RGB-D input of a fixed size. Each pass
//! ends with a device sync so queued kernels count towards its latency.

use std::path::Path;
use std::time::Instant;

use burn::tensor::{backend::Backend, Distribution, Tensor};
use serde::{Deserialize, Serialize};

use crate::model::{GraspNet, GraspNetConfig};
use crate::utils::error::Result;
use crate::utils::logging::ProgressLogger;

/// What to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Untimed passes before measuring
    pub warmup_iterations: usize,
    /// Timed passes
    pub iterations: usize,
    pub batch_size: usize,
    /// Square input side
    pub image_size: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: 10,
            iterations: 100,
            batch_size: 1,
            image_size: 224,
        }
    }
}

/// Summary of per-pass latencies, all in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub std_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
}

impl LatencyStats {
    pub fn from_samples(samples_ms: &[f64]) -> Self {
        if samples_ms.is_empty() {
            return Self::default();
        }

        let mut sorted = samples_ms.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean_ms = sorted.iter().sum::<f64>() / n;
        let var = sorted.iter().map(|t| (t - mean_ms) * (t - mean_ms)).sum::<f64>() / n;

        Self {
            mean_ms,
            std_ms: var.sqrt(),
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p50_ms: nearest_rank(&sorted, 0.50),
            p95_ms: nearest_rank(&sorted, 0.95),
        }
    }
}

/// Nearest-rank quantile of an ascending, non-empty slice
fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Outcome of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub backend: String,
    pub channel_size: usize,
    pub config: BenchmarkConfig,
    pub latency: LatencyStats,
    /// Images per second at the mean latency
    pub throughput: f64,
    pub samples_ms: Vec<f64>,
    /// RFC 3339 time the run finished
    pub timestamp: String,
}

impl BenchmarkResult {
    fn new(backend: &str, channel_size: usize, config: BenchmarkConfig, samples_ms: Vec<f64>) -> Self {
        let latency = LatencyStats::from_samples(&samples_ms);
        let throughput = if latency.mean_ms > 0.0 {
            config.batch_size as f64 * 1000.0 / latency.mean_ms
        } else {
            0.0
        };

        Self {
            backend: backend.to_string(),
            channel_size,
            config,
            latency,
            throughput,
            samples_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the 95th percentile stays within `target_ms`
    pub fn meets_latency_target(&self, target_ms: f64) -> bool {
        self.latency.p95_ms <= target_ms
    }

    /// Write the result as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = self.config.image_size;
        writeln!(f, "Backend:    {}", self.backend)?;
        writeln!(
            f,
            "Input:      {} x {}x{} (channel_size {})",
            self.config.batch_size, side, side, self.channel_size
        )?;
        writeln!(
            f,
            "Passes:     {} timed, {} warmup",
            self.config.iterations, self.config.warmup_iterations
        )?;
        writeln!(
            f,
            "Latency:    {:.2} ms mean, {:.2} ms std",
            self.latency.mean_ms, self.latency.std_ms
        )?;
        writeln!(
            f,
            "Range:      {:.2} .. {:.2} ms (p50 {:.2}, p95 {:.2})",
            self.latency.min_ms, self.latency.max_ms, self.latency.p50_ms, self.latency.p95_ms
        )?;
        write!(f, "Throughput: {:.1} images/s", self.throughput)
    }
}

/// Time forward passes of `model` on random input
pub fn run_benchmark<B: Backend>(
    model: &GraspNet<B>,
    model_config: &GraspNetConfig,
    config: BenchmarkConfig,
    backend: &str,
    device: &B::Device,
) -> Result<BenchmarkResult> {
    model_config.check_input_size(config.image_size, config.image_size)?;

    let input = Tensor::<B, 4>::random(
        [
            config.batch_size,
            model_config.input_channels,
            config.image_size,
            config.image_size,
        ],
        Distribution::Uniform(0.0, 1.0),
        device,
    );

    tracing::info!(
        "Warming up with {} forward passes at {}x{}",
        config.warmup_iterations,
        config.image_size,
        config.image_size
    );
    for _ in 0..config.warmup_iterations {
        let _ = model.forward(input.clone());
        B::sync(device);
    }

    let mut samples_ms = Vec::with_capacity(config.iterations);
    let mut progress = ProgressLogger::new("Benchmark", config.iterations);
    for _ in 0..config.iterations {
        let start = Instant::now();
        let _output = model.forward(input.clone());
        B::sync(device);
        samples_ms.push(start.elapsed().as_secs_f64() * 1000.0);
        progress.increment();
    }
    progress.finish();

    Ok(BenchmarkResult::new(
        backend,
        model_config.channel_size,
        config,
        samples_ms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_latency_stats() {
        let stats = LatencyStats::from_samples(&[10.0, 12.0, 11.0, 15.0, 9.0]);

        assert!((stats.mean_ms - 11.4).abs() < 1e-9);
        assert_eq!(stats.min_ms, 9.0);
        assert_eq!(stats.max_ms, 15.0);
        assert_eq!(stats.p50_ms, 11.0);
        assert_eq!(stats.p95_ms, 15.0);
    }

    #[test]
    fn test_nearest_rank_bounds() {
        let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(nearest_rank(&sorted, 0.0), 1.0);
        assert_eq!(nearest_rank(&sorted, 0.5), 10.0);
        assert_eq!(nearest_rank(&sorted, 1.0), 20.0);
    }

    #[test]
    fn test_empty_samples() {
        let result = BenchmarkResult::new("test", 32, BenchmarkConfig::default(), Vec::new());
        assert_eq!(result.latency, LatencyStats::default());
        assert_eq!(result.throughput, 0.0);
    }

    #[test]
    fn test_latency_target_uses_p95() {
        let result = BenchmarkResult::new(
            "test",
            32,
            BenchmarkConfig::default(),
            vec![100.0, 120.0, 110.0],
        );

        assert!(result.meets_latency_target(120.0));
        assert!(!result.meets_latency_target(115.0));
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("bench.json");
        let result = BenchmarkResult::new(
            "test",
            16,
            BenchmarkConfig {
                batch_size: 2,
                ..Default::default()
            },
            vec![4.0, 6.0],
        );
        result.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["channel_size"], 16);
        assert_eq!(json["samples_ms"].as_array().unwrap().len(), 2);
        assert_eq!(json["throughput"], 400.0);
    }

    #[test]
    fn test_run_benchmark_on_small_network() {
        let device = Default::default();
        let model_config = GraspNetConfig::new().with_channel_size(4);
        let model = model_config.init::<TestBackend>(&device);
        let config = BenchmarkConfig {
            warmup_iterations: 1,
            iterations: 3,
            image_size: 16,
            ..Default::default()
        };

        let result = run_benchmark(&model, &model_config, config, "NdArray", &device).unwrap();
        assert_eq!(result.samples_ms.len(), 3);
        assert!(result.latency.max_ms >= result.latency.min_ms);
        assert!(result.to_string().contains("NdArray"));
    }

    #[test]
    fn test_run_benchmark_rejects_bad_size() {
        let device = Default::default();
        let model_config = GraspNetConfig::new().with_channel_size(4);
        let model = model_config.init::<TestBackend>(&device);
        let config = BenchmarkConfig {
            image_size: 18,
            ..Default::default()
        };

        assert!(run_benchmark(&model, &model_config, config, "NdArray", &device).is_err());
    }
}
