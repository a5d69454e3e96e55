//! Residual block used by the trunk of the grasp network

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Initializer, PaddingConfig2d,
    },
    tensor::{activation::relu, backend::Backend, Tensor},
};

use crate::model::config::RESIDUAL;
use crate::model::init::WeightInit;

/// Two 3x3 conv + batchnorm stages with a skip connection
///
/// `bn2(conv2(relu(bn1(conv1(x))))) + skip(x)`, where `skip` is the identity
/// when input and output widths match and a 1x1 projection otherwise.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    projection: Option<Conv2d<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let padding = PaddingConfig2d::Explicit(RESIDUAL.padding, RESIDUAL.padding);
        let kernel = [RESIDUAL.kernel, RESIDUAL.kernel];

        let conv1 = Conv2dConfig::new([in_channels, out_channels], kernel)
            .with_padding(padding.clone())
            .init(device);
        let conv2 = Conv2dConfig::new([out_channels, out_channels], kernel)
            .with_padding(padding)
            .init(device);

        let projection = (in_channels != out_channels).then(|| {
            Conv2dConfig::new([in_channels, out_channels], [1, 1])
                .with_bias(false)
                .init(device)
        });

        Self {
            conv1,
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2,
            bn2: BatchNormConfig::new(out_channels).init(device),
            projection,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let skip = match &self.projection {
            Some(projection) => projection.forward(input.clone()),
            None => input.clone(),
        };

        let x = relu(self.bn1.forward(self.conv1.forward(input)));
        let x = self.bn2.forward(self.conv2.forward(x));

        x + skip
    }
}

impl<B: Backend> WeightInit for ResidualBlock<B> {
    fn init_weights(self, initializer: &Initializer) -> Self {
        Self {
            conv1: self.conv1.init_weights(initializer),
            conv2: self.conv2.init_weights(initializer),
            projection: self.projection.init_weights(initializer),
            ..self
        }
    }
}
