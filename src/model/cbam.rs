//! Convolutional Block Attention Module (CBAM)
//!
//! Produces a gate in (0, 1) with the same shape as its input. The channel
//! path squeezes the spatial axes and runs a shared 1x1-conv bottleneck over
//! the average and max descriptors. The spatial path looks at the channel
//! refined features through their channel-wise mean and max. Callers decide
//! how the gate is applied.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Initializer, PaddingConfig2d,
    },
    tensor::{
        activation::{relu, sigmoid},
        backend::Backend,
        Tensor,
    },
};

use crate::model::init::WeightInit;

/// Bottleneck ratio of the channel attention MLP
pub const DEFAULT_REDUCTION: usize = 16;

/// Kernel of the spatial attention convolution
pub const SPATIAL_KERNEL: usize = 7;

/// Channel attention: `sigmoid(mlp(avg_pool(x)) + mlp(max_pool(x)))`
#[derive(Module, Debug)]
pub struct ChannelAttention<B: Backend> {
    fc1: Conv2d<B>,
    fc2: Conv2d<B>,
}

impl<B: Backend> ChannelAttention<B> {
    pub fn new(channels: usize, reduction: usize, device: &B::Device) -> Self {
        let hidden = (channels / reduction.max(1)).max(1);

        Self {
            fc1: Conv2dConfig::new([channels, hidden], [1, 1])
                .with_bias(false)
                .init(device),
            fc2: Conv2dConfig::new([hidden, channels], [1, 1])
                .with_bias(false)
                .init(device),
        }
    }

    fn mlp(&self, descriptor: Tensor<B, 4>) -> Tensor<B, 4> {
        self.fc2.forward(relu(self.fc1.forward(descriptor)))
    }

    /// Returns a `[B, C, 1, 1]` gate
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let avg = x.clone().mean_dim(2).mean_dim(3);
        let max = x.max_dim(2).max_dim(3);

        sigmoid(self.mlp(avg) + self.mlp(max))
    }
}

/// Spatial attention: `sigmoid(conv7x7([mean_c(x), max_c(x)]))`
#[derive(Module, Debug)]
pub struct SpatialAttention<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> SpatialAttention<B> {
    pub fn new(device: &B::Device) -> Self {
        let padding = SPATIAL_KERNEL / 2;

        Self {
            conv: Conv2dConfig::new([2, 1], [SPATIAL_KERNEL, SPATIAL_KERNEL])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .with_bias(false)
                .init(device),
        }
    }

    /// Returns a `[B, 1, H, W]` gate
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let avg = x.clone().mean_dim(1);
        let max = x.max_dim(1);

        sigmoid(self.conv.forward(Tensor::cat(vec![avg, max], 1)))
    }
}

/// Channel-then-spatial attention gate
#[derive(Module, Debug)]
pub struct Cbam<B: Backend> {
    channel: ChannelAttention<B>,
    spatial: SpatialAttention<B>,
}

impl<B: Backend> Cbam<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        Self::with_reduction(channels, DEFAULT_REDUCTION, device)
    }

    pub fn with_reduction(channels: usize, reduction: usize, device: &B::Device) -> Self {
        Self {
            channel: ChannelAttention::new(channels, reduction, device),
            spatial: SpatialAttention::new(device),
        }
    }

    /// Gate of shape `[B, C, H, W]`, the product of both attention paths
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let ones = x.ones_like();

        let channel_gate = self.channel.forward(x.clone());
        let refined = x * channel_gate.clone();
        let spatial_gate = self.spatial.forward(refined);

        ones * channel_gate * spatial_gate
    }
}

impl<B: Backend> WeightInit for ChannelAttention<B> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        Self {
            fc1: self.fc1.init_weights(initializer),
            fc2: self.fc2.init_weights(initializer),
        }
    }
}

impl<B: Backend> WeightInit for SpatialAttention<B> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        Self {
            conv: self.conv.init_weights(initializer),
        }
    }
}

impl<B: Backend> WeightInit for Cbam<B> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        Self {
            channel: self.channel.init_weights(initializer),
            spatial: self.spatial.init_weights(initializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_gate_matches_input_shape_and_range() {
        let device = Default::default();
        let cbam = Cbam::<TestBackend>::new(32, &device);
        let input =
            Tensor::<TestBackend, 4>::random([2, 32, 9, 7], Distribution::Default, &device);

        let gate = cbam.forward(input);
        assert_eq!(gate.dims(), [2, 32, 9, 7]);

        let min: f32 = gate.clone().min().into_scalar();
        let max: f32 = gate.max().into_scalar();
        assert!(min > 0.0 && max < 1.0, "gate out of range: [{min}, {max}]");
    }

    #[test]
    fn test_channel_gate_is_per_channel() {
        let device = Default::default();
        let attention = ChannelAttention::<TestBackend>::new(8, 4, &device);
        let input =
            Tensor::<TestBackend, 4>::random([3, 8, 5, 5], Distribution::Default, &device);

        assert_eq!(attention.forward(input).dims(), [3, 8, 1, 1]);
    }

    #[test]
    fn test_narrow_inputs_keep_a_hidden_unit() {
        let device = Default::default();
        let attention = ChannelAttention::<TestBackend>::new(4, DEFAULT_REDUCTION, &device);
        assert_eq!(attention.fc1.weight.val().dims(), [1, 4, 1, 1]);
    }

    #[test]
    fn test_zero_kernels_give_half_gate() {
        let device = Default::default();
        let cbam = Cbam::<TestBackend>::new(16, &device).init_weights(&Initializer::Zeros);
        let input =
            Tensor::<TestBackend, 4>::random([1, 16, 4, 4], Distribution::Default, &device);

        // sigmoid(0) * sigmoid(0)
        let gate = cbam.forward(input);
        let deviation: f32 = (gate - 0.25).abs().max().into_scalar();
        assert!(deviation < 1e-6);
    }
}
