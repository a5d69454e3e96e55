//! Weight initialization for weight-bearing modules.
//!
//! Components with convolution kernels implement [`WeightInit`]; composite
//! modules forward the call to their children. Only kernels are replaced,
//! biases keep whatever the layer config initialized them with.

use burn::module::Param;
use burn::nn::conv::{Conv2d, ConvTranspose2d};
use burn::nn::Initializer;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Xavier-uniform with gain 1, applied to every convolution kernel
pub const XAVIER_UNIFORM: Initializer = Initializer::XavierUniform { gain: 1.0 };

/// A module that owns learnable kernels and accepts an initializer
pub trait WeightInit: Sized {
    /// Re-initialize every kernel owned by this module
    fn init_weights(self, initializer: &Initializer) -> Self;
}

impl<B: Backend> WeightInit for Conv2d<B> {
    fn init_weights(mut self, initializer: &Initializer) -> Self {
        self.weight = reinit_kernel(&self.weight, initializer);
        self
    }
}

impl<B: Backend> WeightInit for ConvTranspose2d<B> {
    fn init_weights(mut self, initializer: &Initializer) -> Self {
        self.weight = reinit_kernel(&self.weight, initializer);
        self
    }
}

impl<M: WeightInit> WeightInit for Option<M> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        self.map(|module| module.init_weights(initializer))
    }
}

impl<M: WeightInit> WeightInit for Vec<M> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        self.into_iter()
            .map(|module| module.init_weights(initializer))
            .collect()
    }
}

/// Fan-in/fan-out of a `[d0, d1, kh, kw]` kernel: `d1 * kh * kw` and `d0 * kh * kw`
pub fn kernel_fans(dims: [usize; 4]) -> (usize, usize) {
    let receptive = dims[2] * dims[3];
    (dims[1] * receptive, dims[0] * receptive)
}

fn reinit_kernel<B: Backend>(
    weight: &Param<Tensor<B, 4>>,
    initializer: &Initializer,
) -> Param<Tensor<B, 4>> {
    let kernel = weight.val();
    let dims = kernel.dims();
    let (fan_in, fan_out) = kernel_fans(dims);

    initializer.init_with(dims, Some(fan_in), Some(fan_out), &kernel.device())
}
