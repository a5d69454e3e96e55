//! Model Configuration Module
//!
//! Construction parameters of the grasp network and the per-layer geometry
//! of its convolution stages. The geometry constants are shared between the
//! layer constructors and the shape arithmetic below, so the documented
//! output sizes always follow the layers that are actually built.

use burn::config::Config;
use burn::tensor::backend::Backend;

use crate::model::grasp_net::GraspNet;
use crate::utils::error::{GraspError, Result as GraspResult};

/// Smallest input side the stem and decoder can process
pub const MIN_INPUT_SIZE: usize = 8;

/// Every input side has to be a multiple of this (two stride-2 stages)
pub const INPUT_SIZE_MULTIPLE: usize = 4;

/// Configuration of the grasp network
#[derive(Config, Debug)]
pub struct GraspNetConfig {
    /// Number of input image channels (RGB + depth)
    #[config(default = 4)]
    pub input_channels: usize,

    /// Channels per output head
    #[config(default = 1)]
    pub output_channels: usize,

    /// Base width multiplier for all internal convolutions
    #[config(default = 32)]
    pub channel_size: usize,

    /// Apply dropout before each output head
    #[config(default = false)]
    pub dropout: bool,

    /// Dropout probability when dropout is enabled
    #[config(default = 0.0)]
    pub prob: f64,
}

impl GraspNetConfig {
    /// Build the network on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> GraspNet<B> {
        GraspNet::new(self, device)
    }

    /// Spatial size of the four output maps for a given input side
    ///
    /// Replays the kernel/stride/padding chain of every stage. Returns `None`
    /// when some stage would produce an empty feature map.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        stage_sizes(input).map(|sizes| sizes[sizes.len() - 1].1)
    }

    /// Per-stage shapes `(name, channels, height, width)` for an input size
    pub fn stage_shapes(&self, height: usize, width: usize) -> Option<Vec<StageShape>> {
        let heights = stage_sizes(height)?;
        let widths = stage_sizes(width)?;
        let c = self.channel_size;

        let channels = [
            self.input_channels,
            c,
            c * 2,
            c * 4,
            c * 4,
            c * 4,
            c * 2,
            c,
            c,
            self.output_channels,
        ];

        Some(
            heights
                .iter()
                .zip(widths.iter())
                .zip(channels.iter())
                .map(|(((name, h), (_, w)), &channels)| StageShape {
                    name: *name,
                    channels,
                    height: *h,
                    width: *w,
                })
                .collect(),
        )
    }

    /// Check that an input size can be reconstructed by the decoder
    ///
    /// The network itself never validates its input; callers use this
    /// before feeding images of a new resolution.
    pub fn check_input_size(&self, height: usize, width: usize) -> GraspResult<()> {
        for (axis, size) in [("height", height), ("width", width)] {
            if size < MIN_INPUT_SIZE {
                return Err(GraspError::InvalidInput(format!(
                    "input {} {} is below the minimum of {}",
                    axis, size, MIN_INPUT_SIZE
                )));
            }
            if size % INPUT_SIZE_MULTIPLE != 0 {
                return Err(GraspError::InvalidInput(format!(
                    "input {} {} is not a multiple of {}",
                    axis, size, INPUT_SIZE_MULTIPLE
                )));
            }
        }
        Ok(())
    }
}

/// Shape of one network stage for a concrete input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageShape {
    pub name: &'static str,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl std::fmt::Display for StageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} [{}, {}, {}]",
            self.name, self.channels, self.height, self.width
        )
    }
}

/// Kernel/stride/padding of one convolution stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    pub output_padding: usize,
}

impl ConvGeometry {
    pub const fn new(kernel: usize, stride: usize, padding: usize) -> Self {
        Self {
            kernel,
            stride,
            padding,
            output_padding: 0,
        }
    }

    pub const fn with_output_padding(self, output_padding: usize) -> Self {
        Self {
            output_padding,
            ..self
        }
    }

    /// `(in + 2p - k) / s + 1`
    pub fn conv_output(&self, input: usize) -> Option<usize> {
        (input + 2 * self.padding)
            .checked_sub(self.kernel)
            .map(|span| span / self.stride + 1)
    }

    /// `(in - 1) * s - 2p + k + op`
    pub fn transposed_output(&self, input: usize) -> Option<usize> {
        let grown = input.checked_sub(1)? * self.stride + self.kernel + self.output_padding;
        grown.checked_sub(2 * self.padding).filter(|&size| size > 0)
    }
}

/// Full-resolution 9x9 stem convolution
pub const STEM: ConvGeometry = ConvGeometry::new(9, 1, 4);
/// Stride-2 downsampling convolutions of the stem
pub const DOWNSAMPLE: ConvGeometry = ConvGeometry::new(4, 2, 1);
/// 3x3 convolutions inside the residual blocks
pub const RESIDUAL: ConvGeometry = ConvGeometry::new(3, 1, 1);
/// 1x1 projection after attention fusion
pub const FUSE: ConvGeometry = ConvGeometry::new(1, 1, 0);
/// First transposed convolution of the decoder
pub const UPSAMPLE_1: ConvGeometry = ConvGeometry::new(4, 2, 1).with_output_padding(1);
/// Second transposed convolution of the decoder
pub const UPSAMPLE_2: ConvGeometry = ConvGeometry::new(4, 2, 2).with_output_padding(1);
/// Final stride-1 9x9 stage of the decoder
pub const DECODER_OUT: ConvGeometry = ConvGeometry::new(9, 1, 4);
/// Output head convolutions
pub const HEAD: ConvGeometry = ConvGeometry::new(2, 1, 0);

/// Spatial size after each stage along one axis
fn stage_sizes(input: usize) -> Option<Vec<(&'static str, usize)>> {
    let x1 = STEM.conv_output(input)?;
    let x2 = DOWNSAMPLE.conv_output(x1)?;
    let x3 = DOWNSAMPLE.conv_output(x2)?;
    // residual blocks and the 1x1 fusion keep the size
    let trunk = RESIDUAL.conv_output(x3)?;
    let fused = FUSE.conv_output(trunk)?;
    let up1 = UPSAMPLE_1.transposed_output(fused)?;
    let up2 = UPSAMPLE_2.transposed_output(up1)?;
    let decoded = DECODER_OUT.transposed_output(up2)?;
    let heads = HEAD.conv_output(decoded)?;

    Some(vec![
        ("input", input),
        ("x1", x1),
        ("x2", x2),
        ("x3", x3),
        ("x5", trunk),
        ("fused", fused),
        ("up1", up1),
        ("up2", up2),
        ("decoded", decoded),
        ("heads", heads),
    ])
}
