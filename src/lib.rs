//! # AGRNet
//!
//! An attention-gated residual network for dense grasp detection, built with
//! the Burn framework.
//!
//! Given a `[B, C, H, W]` RGB-D image the network predicts four dense maps:
//! grasp quality, `cos(2θ)`, `sin(2θ)` and gripper width.
//!
//! ## Modules
//!
//! - `model`: GraspNet, its residual and CBAM blocks, config and shape arithmetic
//! - `dataset`: name-based dataset lookup and the Cornell / CBRGD file readers
//! - `inference`: prediction wrapper and forward-pass benchmarking
//! - `backend`: compile-time backend selection
//! - `utils`: errors, logging and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agrnet::model::GraspNetConfig;
//! use agrnet::backend::{default_device, DefaultBackend};
//!
//! let device = default_device();
//! let config = GraspNetConfig::new();
//! let model = config.init::<DefaultBackend>(&device);
//! let out = model.forward(input); // pos, cos, sin, width
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{get_dataset, DatasetKind, DatasetOptions, GraspDataset, GraspSampleFiles};
pub use inference::benchmark::BenchmarkResult;
pub use inference::predictor::{GraspPrediction, Predictor};
pub use model::{GraspLoss, GraspNet, GraspNetConfig, GraspOutput, GraspTargets};
pub use utils::error::{GraspError, Result};
