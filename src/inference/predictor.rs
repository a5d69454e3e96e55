//! Inference Predictor Module
//!
//! Runs the grasp network on prepared input tensors and turns the four head
//! maps into host-side predictions.

use std::time::{Duration, Instant};

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::model::{GraspNet, GraspNetConfig, GraspOutput};
use crate::utils::error::{GraspError, Result};

/// Dense grasp maps for a single image
///
/// Maps are row-major `[rows * cols]`, taken from the first output channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraspPrediction {
    pub rows: usize,
    pub cols: usize,

    /// Grasp quality per pixel
    pub pos: Vec<f32>,
    pub cos: Vec<f32>,
    pub sin: Vec<f32>,

    /// Gripper opening per pixel
    pub width: Vec<f32>,

    /// Forward time of the whole batch in milliseconds
    pub inference_time_ms: f64,
}

/// The highest-quality pixel of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraspPoint {
    pub row: usize,
    pub col: usize,
    pub quality: f32,
    /// Gripper angle in radians, from the doubled-angle encoding
    pub angle: f32,
    pub width: f32,
}

impl GraspPrediction {
    /// Pixel with the highest quality, if the map is not empty
    pub fn best_grasp(&self) -> Option<GraspPoint> {
        let (idx, &quality) = self
            .pos
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        Some(GraspPoint {
            row: idx / self.cols,
            col: idx % self.cols,
            quality,
            angle: 0.5 * self.sin[idx].atan2(self.cos[idx]),
            width: self.width[idx],
        })
    }
}

/// Split batched head maps into one prediction per image
fn split_batch<B: Backend>(output: GraspOutput<B>, elapsed: Duration) -> Result<Vec<GraspPrediction>> {
    let [batch, _, rows, cols] = output.pos.dims();
    let first_channel = |t: Tensor<B, 4>| -> Result<Vec<f32>> {
        t.narrow(1, 0, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| GraspError::Model(format!("failed to read output map: {:?}", e)))
    };

    let pos = first_channel(output.pos)?;
    let cos = first_channel(output.cos)?;
    let sin = first_channel(output.sin)?;
    let width = first_channel(output.width)?;

    let plane = rows * cols;
    let inference_time_ms = elapsed.as_secs_f64() * 1000.0;

    Ok((0..batch)
        .map(|b| {
            let range = b * plane..(b + 1) * plane;
            GraspPrediction {
                rows,
                cols,
                pos: pos[range.clone()].to_vec(),
                cos: cos[range.clone()].to_vec(),
                sin: sin[range.clone()].to_vec(),
                width: width[range].to_vec(),
                inference_time_ms,
            }
        })
        .collect())
}

/// Wraps a network together with the config it was built from
pub struct Predictor<B: Backend> {
    model: GraspNet<B>,
    config: GraspNetConfig,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: GraspNet<B>, config: GraspNetConfig) -> Self {
        Self { model, config }
    }

    /// Run the network on `[B, input_channels, H, W]` and return one
    /// prediction per batch item
    pub fn predict(&self, input: Tensor<B, 4>) -> Result<Vec<GraspPrediction>> {
        let [_, channels, height, width] = input.dims();
        if channels != self.config.input_channels {
            return Err(GraspError::InvalidInput(format!(
                "expected {} input channels, got {}",
                self.config.input_channels, channels
            )));
        }
        self.config.check_input_size(height, width)?;

        let start = Instant::now();
        let output = self.model.forward(input);
        let predictions = split_batch(output, start.elapsed())?;

        tracing::debug!(
            "Predicted {} grasp maps in {:.2}ms",
            predictions.len(),
            predictions.first().map(|p| p.inference_time_ms).unwrap_or(0.0)
        );
        Ok(predictions)
    }
}
