//! Inference module for grasp prediction and benchmarking
//!
//! This module provides:
//! - Batched prediction into per-image grasp maps
//! - Forward-pass latency benchmarking

pub mod benchmark;
pub mod predictor;

// Re-export main types for convenience
pub use benchmark::{run_benchmark, BenchmarkConfig, BenchmarkResult, LatencyStats};
pub use predictor::{GraspPoint, GraspPrediction, Predictor};

/// Target latency for a single 224x224 forward pass (milliseconds)
pub const TARGET_LATENCY_MS: f64 = 200.0;
