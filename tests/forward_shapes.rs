use agrnet::model::{GraspNet, GraspNetConfig};
use burn::backend::Autodiff;
use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;

type Backend = NdArray<f32>;
type ADBackend = Autodiff<NdArray<f32>>;

#[test]
fn forward_shapes_reference_input() {
    let device = <Backend as burn::tensor::backend::Backend>::Device::default();
    let config = GraspNetConfig::new();
    let model: GraspNet<Backend> = config.init(&device);

    let input = Tensor::<Backend, 4>::random([1, 4, 224, 224], Distribution::Default, &device);
    let out = model.forward(input);

    let expected = config.output_size(224).unwrap();
    assert_eq!(expected, 224);
    for dims in out.dims() {
        assert_eq!(dims, [1, 1, expected, expected]);
    }
}

#[test]
fn forward_shapes_do_not_depend_on_channel_size() {
    let device = <Backend as burn::tensor::backend::Backend>::Device::default();

    for channel_size in [16, 32, 64] {
        let model: GraspNet<Backend> = GraspNetConfig::new()
            .with_channel_size(channel_size)
            .init(&device);
        let input = Tensor::<Backend, 4>::zeros([1, 4, 64, 64], &device);

        for dims in model.forward(input).dims() {
            assert_eq!(dims, [1, 1, 64, 64], "channel_size {}", channel_size);
        }
    }
}

#[test]
fn forward_shapes_depth_only_multi_output() {
    let device = <ADBackend as burn::tensor::backend::Backend>::Device::default();
    let model: GraspNet<ADBackend> = GraspNetConfig::new()
        .with_input_channels(1)
        .with_output_channels(2)
        .with_channel_size(8)
        .with_dropout(true)
        .with_prob(0.1)
        .init(&device);

    let input = Tensor::<ADBackend, 4>::ones([3, 1, 40, 24], &device);
    for dims in model.forward(input).dims() {
        assert_eq!(dims, [3, 2, 40, 24]);
    }
}

#[test]
fn summary_shapes_match_forward() {
    let device = <Backend as burn::tensor::backend::Backend>::Device::default();
    let config = GraspNetConfig::new().with_channel_size(8);
    let model: GraspNet<Backend> = config.init(&device);

    let shapes = config.stage_shapes(48, 48).unwrap();
    let heads = shapes.last().unwrap();

    let out = model.forward(Tensor::<Backend, 4>::zeros([1, 4, 48, 48], &device));
    assert_eq!(
        out.pos.dims(),
        [1, heads.channels, heads.height, heads.width]
    );
}
