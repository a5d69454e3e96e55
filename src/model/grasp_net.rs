//! Attention-gated residual grasp network
//!
//! Maps an RGB-D image `[B, C_in, H, W]` to four dense maps: grasp quality,
//! cos(2θ), sin(2θ) and gripper width. A strided stem reduces the image to a
//! quarter resolution, five residual blocks refine it, and CBAM gates taken
//! before and after the trunk are fused before a transposed-convolution
//! decoder restores the resolution.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        loss::{HuberLossConfig, Reduction},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Initializer, PaddingConfig2d,
    },
    tensor::{activation::relu, backend::Backend, Tensor},
};

use crate::model::cbam::Cbam;
use crate::model::config::{
    ConvGeometry, GraspNetConfig, DECODER_OUT, DOWNSAMPLE, FUSE, HEAD, STEM, UPSAMPLE_1,
    UPSAMPLE_2,
};
use crate::model::init::{WeightInit, XAVIER_UNIFORM};
use crate::model::residual::ResidualBlock;

/// Blend weight of both attention gates
pub const ATTENTION_WEIGHT: f64 = 0.05;

/// Number of residual blocks in the trunk
pub const NUM_RESIDUAL_BLOCKS: usize = 5;

/// `x * (1 + gate * weight)`
///
/// With a small weight the gate only perturbs the features around identity.
pub fn attention_blend<B: Backend>(
    x: Tensor<B, 4>,
    gate: Tensor<B, 4>,
    weight: f64,
) -> Tensor<B, 4> {
    x * (gate * weight + 1.0)
}

/// The four output maps, each `[B, output_channels, H', W']`
#[derive(Debug, Clone)]
pub struct GraspOutput<B: Backend> {
    pub pos: Tensor<B, 4>,
    pub cos: Tensor<B, 4>,
    pub sin: Tensor<B, 4>,
    pub width: Tensor<B, 4>,
}

impl<B: Backend> GraspOutput<B> {
    pub fn dims(&self) -> [[usize; 4]; 4] {
        [
            self.pos.dims(),
            self.cos.dims(),
            self.sin.dims(),
            self.width.dims(),
        ]
    }
}

/// Ground-truth maps matching [`GraspOutput`]
#[derive(Debug, Clone)]
pub struct GraspTargets<B: Backend> {
    pub pos: Tensor<B, 4>,
    pub cos: Tensor<B, 4>,
    pub sin: Tensor<B, 4>,
    pub width: Tensor<B, 4>,
}

/// Per-head smooth-L1 losses and their unweighted sum
#[derive(Debug, Clone)]
pub struct GraspLoss<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub p_loss: Tensor<B, 1>,
    pub cos_loss: Tensor<B, 1>,
    pub sin_loss: Tensor<B, 1>,
    pub width_loss: Tensor<B, 1>,
}

/// Grasp detection network
#[derive(Module, Debug)]
pub struct GraspNet<B: Backend> {
    // Stem
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B, 2>,

    // Trunk
    residuals: Vec<ResidualBlock<B>>,

    // Attention fusion
    cbam3: Cbam<B>,
    cbam5: Cbam<B>,
    fuse_conv: Conv2d<B>,
    fuse_bn: BatchNorm<B, 2>,

    // Decoder
    conv4: ConvTranspose2d<B>,
    bn4: BatchNorm<B, 2>,
    conv5: ConvTranspose2d<B>,
    bn5: BatchNorm<B, 2>,
    conv6: ConvTranspose2d<B>,

    // Heads
    pos_output: Conv2d<B>,
    cos_output: Conv2d<B>,
    sin_output: Conv2d<B>,
    width_output: Conv2d<B>,

    dropout_pos: Dropout,
    dropout_cos: Dropout,
    dropout_sin: Dropout,
    dropout_wid: Dropout,
    dropout: bool,
}

fn conv(channels: [usize; 2], geometry: ConvGeometry) -> Conv2dConfig {
    Conv2dConfig::new(channels, [geometry.kernel, geometry.kernel])
        .with_stride([geometry.stride, geometry.stride])
        .with_padding(PaddingConfig2d::Explicit(geometry.padding, geometry.padding))
}

fn conv_transpose(channels: [usize; 2], geometry: ConvGeometry) -> ConvTranspose2dConfig {
    ConvTranspose2dConfig::new(channels, [geometry.kernel, geometry.kernel])
        .with_stride([geometry.stride, geometry.stride])
        .with_padding([geometry.padding, geometry.padding])
        .with_padding_out([geometry.output_padding, geometry.output_padding])
}

impl<B: Backend> GraspNet<B> {
    /// Build the network; every convolution kernel is Xavier-uniform initialized
    pub fn new(config: &GraspNetConfig, device: &B::Device) -> Self {
        let c = config.channel_size;
        let heads = [c, config.output_channels];

        let residuals = (0..NUM_RESIDUAL_BLOCKS)
            .map(|_| ResidualBlock::new(c * 4, c * 4, device))
            .collect();

        let net = Self {
            conv1: conv([config.input_channels, c], STEM).init(device),
            bn1: BatchNormConfig::new(c).init(device),
            conv2: conv([c, c * 2], DOWNSAMPLE).init(device),
            bn2: BatchNormConfig::new(c * 2).init(device),
            conv3: conv([c * 2, c * 4], DOWNSAMPLE).init(device),
            bn3: BatchNormConfig::new(c * 4).init(device),

            residuals,

            cbam3: Cbam::new(c * 4, device),
            cbam5: Cbam::new(c * 4, device),
            fuse_conv: conv([c * 8, c * 4], FUSE)
                .with_bias(false)
                .init(device),
            fuse_bn: BatchNormConfig::new(c * 4).init(device),

            conv4: conv_transpose([c * 4, c * 2], UPSAMPLE_1).init(device),
            bn4: BatchNormConfig::new(c * 2).init(device),
            conv5: conv_transpose([c * 2, c], UPSAMPLE_2).init(device),
            bn5: BatchNormConfig::new(c).init(device),
            conv6: conv_transpose([c, c], DECODER_OUT).init(device),

            pos_output: conv(heads, HEAD).init(device),
            cos_output: conv(heads, HEAD).init(device),
            sin_output: conv(heads, HEAD).init(device),
            width_output: conv(heads, HEAD).init(device),

            dropout_pos: DropoutConfig::new(config.prob).init(),
            dropout_cos: DropoutConfig::new(config.prob).init(),
            dropout_sin: DropoutConfig::new(config.prob).init(),
            dropout_wid: DropoutConfig::new(config.prob).init(),
            dropout: config.dropout,
        }
        .init_weights(&XAVIER_UNIFORM);

        tracing::debug!(
            channel_size = c,
            dropout = config.dropout,
            prob = config.prob,
            params = net.num_params(),
            "Built grasp network"
        );

        net
    }

    /// Whether dropout is applied before the heads
    pub fn dropout_enabled(&self) -> bool {
        self.dropout
    }

    /// Forward pass producing the four grasp maps
    pub fn forward(&self, x_in: Tensor<B, 4>) -> GraspOutput<B> {
        // Stem: [B, C, H, W] -> [B, 2C, H/2, W/2] -> [B, 4C, H/4, W/4]
        let x1 = relu(self.bn1.forward(self.conv1.forward(x_in)));
        let x2 = relu(self.bn2.forward(self.conv2.forward(x1)));
        let x3 = relu(self.bn3.forward(self.conv3.forward(x2)));

        let x5 = self
            .residuals
            .iter()
            .fold(x3.clone(), |x, block| block.forward(x));

        let x3_attn = attention_blend(x3.clone(), self.cbam3.forward(x3), ATTENTION_WEIGHT);
        let x5_attn = attention_blend(x5.clone(), self.cbam5.forward(x5), ATTENTION_WEIGHT);

        // [B, 8C, H/4, W/4] -> [B, 4C, H/4, W/4]
        let fused = Tensor::cat(vec![x3_attn, x5_attn], 1);
        let x = relu(self.fuse_bn.forward(self.fuse_conv.forward(fused)));

        let x = relu(self.bn4.forward(self.conv4.forward(x)));
        let x = relu(self.bn5.forward(self.conv5.forward(x)));
        let x = self.conv6.forward(x);

        if self.dropout {
            GraspOutput {
                pos: self.pos_output.forward(self.dropout_pos.forward(x.clone())),
                cos: self.cos_output.forward(self.dropout_cos.forward(x.clone())),
                sin: self.sin_output.forward(self.dropout_sin.forward(x.clone())),
                width: self.width_output.forward(self.dropout_wid.forward(x)),
            }
        } else {
            GraspOutput {
                pos: self.pos_output.forward(x.clone()),
                cos: self.cos_output.forward(x.clone()),
                sin: self.sin_output.forward(x.clone()),
                width: self.width_output.forward(x),
            }
        }
    }

    /// Smooth-L1 loss of every head against its target map
    ///
    /// Returns the losses together with the prediction they were computed on.
    pub fn compute_loss(
        &self,
        x_in: Tensor<B, 4>,
        targets: GraspTargets<B>,
    ) -> (GraspLoss<B>, GraspOutput<B>) {
        let output = self.forward(x_in);
        let smooth_l1 = HuberLossConfig::new(1.0).init();

        let p_loss = smooth_l1.forward(output.pos.clone(), targets.pos, Reduction::Mean);
        let cos_loss = smooth_l1.forward(output.cos.clone(), targets.cos, Reduction::Mean);
        let sin_loss = smooth_l1.forward(output.sin.clone(), targets.sin, Reduction::Mean);
        let width_loss = smooth_l1.forward(output.width.clone(), targets.width, Reduction::Mean);

        let loss = p_loss.clone() + cos_loss.clone() + sin_loss.clone() + width_loss.clone();

        (
            GraspLoss {
                loss,
                p_loss,
                cos_loss,
                sin_loss,
                width_loss,
            },
            output,
        )
    }
}

impl<B: Backend> WeightInit for GraspNet<B> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        Self {
            conv1: self.conv1.init_weights(initializer),
            conv2: self.conv2.init_weights(initializer),
            conv3: self.conv3.init_weights(initializer),
            residuals: self.residuals.init_weights(initializer),
            cbam3: self.cbam3.init_weights(initializer),
            cbam5: self.cbam5.init_weights(initializer),
            fuse_conv: self.fuse_conv.init_weights(initializer),
            conv4: self.conv4.init_weights(initializer),
            conv5: self.conv5.init_weights(initializer),
            conv6: self.conv6.init_weights(initializer),
            pos_output: self.pos_output.init_weights(initializer),
            cos_output: self.cos_output.init_weights(initializer),
            sin_output: self.sin_output.init_weights(initializer),
            width_output: self.width_output.init_weights(initializer),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn::tensor::{Distribution, ElementConversion};
    use burn_ndarray::NdArray;

    use crate::model::init::kernel_fans;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn small_config() -> GraspNetConfig {
        GraspNetConfig::new().with_channel_size(8)
    }

    fn random_input<B: Backend>(shape: [usize; 4], device: &B::Device) -> Tensor<B, 4> {
        Tensor::random(shape, Distribution::Uniform(0.0, 1.0), device)
    }

    fn max_abs_diff<B: Backend>(a: Tensor<B, 4>, b: Tensor<B, 4>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    #[test]
    fn test_heads_share_batch_and_spatial_dims() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);

        let output = model.forward(random_input([2, 4, 32, 48], &device));
        for dims in output.dims() {
            assert_eq!(dims, [2, 1, 32, 48]);
        }
    }

    #[test]
    fn test_output_channels_apply_to_every_head() {
        let device = Default::default();
        let model = small_config()
            .with_input_channels(1)
            .with_output_channels(2)
            .init::<TestBackend>(&device);

        let output = model.forward(random_input([1, 1, 16, 16], &device));
        for dims in output.dims() {
            assert_eq!(dims, [1, 2, 16, 16]);
        }
    }

    #[test]
    fn test_forward_is_deterministic_without_dropout() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let input = random_input([1, 4, 32, 32], &device);

        let first = model.forward(input.clone());
        let second = model.forward(input);
        assert!(max_abs_diff(first.pos, second.pos) <= 1e-6);
        assert!(max_abs_diff(first.width, second.width) <= 1e-6);
    }

    #[test]
    fn test_dropout_makes_training_forward_stochastic() {
        let device = Default::default();
        let model = small_config()
            .with_dropout(true)
            .with_prob(0.5)
            .init::<TestAutodiffBackend>(&device);
        let input = random_input([1, 4, 32, 32], &device);

        let first = model.forward(input.clone());
        let second = model.forward(input);
        assert!(max_abs_diff(first.pos, second.pos) > 0.0);
        assert!(max_abs_diff(first.sin, second.sin) > 0.0);
    }

    /// Give all four heads the same all-ones kernel and no bias
    fn with_identical_heads<B: Backend>(mut model: GraspNet<B>) -> GraspNet<B> {
        for head in [
            &mut model.pos_output,
            &mut model.cos_output,
            &mut model.sin_output,
            &mut model.width_output,
        ] {
            *head = head.clone().init_weights(&Initializer::Ones);
            head.bias = None;
        }
        model
    }

    #[test]
    fn test_identical_heads_agree_without_dropout() {
        let device = Default::default();
        let model = with_identical_heads(small_config().init::<TestAutodiffBackend>(&device));

        let output = model.forward(random_input([1, 4, 32, 32], &device));
        assert!(max_abs_diff(output.pos.clone(), output.cos) <= 1e-6);
        assert!(max_abs_diff(output.pos, output.width) <= 1e-6);
    }

    #[test]
    fn test_dropout_masks_are_independent_per_head() {
        let device = Default::default();
        let model = with_identical_heads(
            small_config()
                .with_dropout(true)
                .with_prob(0.5)
                .init::<TestAutodiffBackend>(&device),
        );

        let output = model.forward(random_input([1, 4, 32, 32], &device));
        assert!(max_abs_diff(output.pos.clone(), output.cos.clone()) > 0.0);
        assert!(max_abs_diff(output.pos.clone(), output.sin) > 0.0);
        assert!(max_abs_diff(output.cos, output.width) > 0.0);
    }

    #[test]
    fn test_zero_probability_dropout_matches_disabled() {
        let device = Default::default();
        let with_dropout = small_config()
            .with_dropout(true)
            .with_prob(0.0)
            .init::<TestAutodiffBackend>(&device);
        let without_dropout = small_config()
            .init::<TestAutodiffBackend>(&device)
            .load_record(with_dropout.clone().into_record());

        assert!(with_dropout.dropout_enabled());
        assert!(!without_dropout.dropout_enabled());

        let input = random_input([1, 4, 32, 32], &device);
        let a = with_dropout.forward(input.clone());
        let b = without_dropout.forward(input);
        assert!(max_abs_diff(a.pos, b.pos) <= 1e-6);
        assert!(max_abs_diff(a.cos, b.cos) <= 1e-6);
        assert!(max_abs_diff(a.sin, b.sin) <= 1e-6);
        assert!(max_abs_diff(a.width, b.width) <= 1e-6);
    }

    #[test]
    fn test_attention_blend_with_zero_gate_is_identity() {
        let device = Default::default();
        let x = random_input::<TestBackend>([2, 16, 8, 8], &device);
        let gate = x.zeros_like();

        let blended = attention_blend(x.clone(), gate, ATTENTION_WEIGHT);
        assert_eq!(
            blended.into_data().to_vec::<f32>().unwrap(),
            x.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_attention_blend_with_full_gate_scales_by_weight() {
        let device = Default::default();
        let x = random_input::<TestBackend>([1, 4, 4, 4], &device);
        let gate = x.ones_like();

        let blended = attention_blend(x.clone(), gate, ATTENTION_WEIGHT);
        assert!(max_abs_diff(blended, x * 1.05) < 1e-6);
    }

    #[test]
    fn test_kernels_are_xavier_initialized() {
        let device = Default::default();
        let model = GraspNetConfig::new().init::<TestBackend>(&device);

        let kernels = [
            model.conv1.weight.val(),
            model.fuse_conv.weight.val(),
            model.conv6.weight.val(),
            model.pos_output.weight.val(),
        ];
        for kernel in kernels {
            let (fan_in, fan_out) = kernel_fans(kernel.dims());
            let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
            let observed: f32 = kernel.abs().max().into_scalar();
            assert!(observed <= bound * 1.0001, "{observed} > {bound}");
        }

        assert!(model.conv1.bias.is_some());
        assert!(model.fuse_conv.bias.is_none());
    }

    #[test]
    fn test_loss_is_sum_of_head_losses() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let input = random_input([1, 4, 16, 16], &device);
        let target = || random_input::<TestBackend>([1, 1, 16, 16], &device);

        let (losses, output) = model.compute_loss(
            input,
            GraspTargets {
                pos: target(),
                cos: target(),
                sin: target(),
                width: target(),
            },
        );

        let total: f32 = losses.loss.into_scalar();
        let parts: f32 = losses.p_loss.into_scalar()
            + losses.cos_loss.into_scalar()
            + losses.sin_loss.into_scalar()
            + losses.width_loss.into_scalar();
        assert!((total - parts).abs() < 1e-5);
        assert_eq!(output.pos.dims(), [1, 1, 16, 16]);
    }

    #[test]
    fn test_loss_vanishes_for_perfect_targets() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let input = random_input([1, 4, 16, 16], &device);

        let prediction = model.forward(input.clone());
        let (losses, _) = model.compute_loss(
            input,
            GraspTargets {
                pos: prediction.pos,
                cos: prediction.cos,
                sin: prediction.sin,
                width: prediction.width,
            },
        );

        let total: f32 = losses.loss.into_scalar();
        assert!(total.abs() < 1e-6);
    }
}
