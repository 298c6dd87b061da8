//! Burn models for the FLA visual-odometry pipeline.
//!
//! `ConvAutoencoder` compresses a `[N, 1, H, W]` image to a `[N, 4, H/4, W/4]` latent
//! map and reconstructs it back to `[N, 1, H, W]` with values in `[0, 1]`.
//!
//! Encoder: conv3x3(1->16, same) + ReLU + maxpool2x2, conv3x3(16->4, same) + ReLU + maxpool2x2.
//! Decoder: tconv2x2/2(4->16) + ReLU, tconv2x2/2(16->1) + sigmoid.

use burn::module::{Ignored, Module};
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use thiserror::Error;

/// Two 2x2 poolings followed by two stride-2 transposed convolutions.
pub const SPATIAL_DIVISOR: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("input shape {dims:?} invalid: {reason}")]
    Shape { dims: [usize; 4], reason: String },
    #[error("cannot read parameter values back to the host: {0}")]
    HostRead(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ConvAutoencoderConfig {
    /// Channels after the first convolution (and before the last transposed one).
    pub conv_channels: usize,
    /// Channels of the latent representation.
    pub latent_channels: usize,
}

impl Default for ConvAutoencoderConfig {
    fn default() -> Self {
        Self {
            conv_channels: 16,
            latent_channels: 4,
        }
    }
}

/// The one capability callers need from a reconstruction model.
pub trait Reconstruct<B: Backend> {
    fn reconstruct(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ModelError>;
}

#[derive(Module, Debug)]
pub struct ConvAutoencoder<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    t_conv1: ConvTranspose2d<B>,
    t_conv2: ConvTranspose2d<B>,
    pub config: Ignored<ConvAutoencoderConfig>,
}

impl<B: Backend> ConvAutoencoder<B> {
    pub fn new(config: ConvAutoencoderConfig, device: &B::Device) -> Self {
        let hidden = config.conv_channels;
        let latent = config.latent_channels;
        let conv1 = Conv2dConfig::new([1, hidden], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([hidden, latent], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let t_conv1 = ConvTranspose2dConfig::new([latent, hidden], [2, 2])
            .with_stride([2, 2])
            .init(device);
        let t_conv2 = ConvTranspose2dConfig::new([hidden, 1], [2, 2])
            .with_stride([2, 2])
            .init(device);

        Self {
            conv1,
            conv2,
            pool,
            t_conv1,
            t_conv2,
            config: Ignored(config),
        }
    }

    /// `[N, 1, H, W]` -> latent `[N, latent, H/4, W/4]`.
    pub fn encode(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv1.forward(input));
        let x = self.pool.forward(x);
        let x = relu(self.conv2.forward(x));
        self.pool.forward(x)
    }

    /// Latent `[N, latent, h, w]` -> `[N, 1, 4h, 4w]` in `[0, 1]`.
    pub fn decode(&self, latent: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.t_conv1.forward(latent));
        sigmoid(self.t_conv2.forward(x))
    }

    /// Full pass without shape validation; see [`ConvAutoencoder::try_forward`].
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decode(self.encode(input))
    }

    pub fn try_forward(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ModelError> {
        validate_input_dims(input.dims())?;
        Ok(self.forward(input))
    }

    /// All weights and biases flattened in layer order (conv1, conv2, t_conv1, t_conv2).
    pub fn parameter_values(&self) -> Result<Vec<f32>, ModelError> {
        let mut out = Vec::with_capacity(self.num_params());
        push_conv(&mut out, &self.conv1)?;
        push_conv(&mut out, &self.conv2)?;
        push_tconv(&mut out, &self.t_conv1)?;
        push_tconv(&mut out, &self.t_conv2)?;
        Ok(out)
    }
}

impl<B: Backend> Reconstruct<B> for ConvAutoencoder<B> {
    fn reconstruct(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ModelError> {
        self.try_forward(input)
    }
}

/// Check the `[N, 1, H, W]` contract: one channel, non-empty, H and W divisible by 4.
pub fn validate_input_dims(dims: [usize; 4]) -> Result<(), ModelError> {
    let [n, c, h, w] = dims;
    let reason = if n == 0 {
        Some("empty batch".to_string())
    } else if c != 1 {
        Some(format!("expected 1 channel, got {c}"))
    } else if h == 0 || w == 0 {
        Some("zero spatial size".to_string())
    } else if h % SPATIAL_DIVISOR != 0 || w % SPATIAL_DIVISOR != 0 {
        Some(format!(
            "height and width must be divisible by {SPATIAL_DIVISOR}"
        ))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ModelError::Shape { dims, reason }),
        None => Ok(()),
    }
}

fn host_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, ModelError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ModelError::HostRead(format!("{e:?}")))
}

fn push_conv<B: Backend>(out: &mut Vec<f32>, layer: &Conv2d<B>) -> Result<(), ModelError> {
    out.extend(host_values(layer.weight.val())?);
    if let Some(bias) = &layer.bias {
        out.extend(host_values(bias.val())?);
    }
    Ok(())
}

fn push_tconv<B: Backend>(
    out: &mut Vec<f32>,
    layer: &ConvTranspose2d<B>,
) -> Result<(), ModelError> {
    out.extend(host_values(layer.weight.val())?);
    if let Some(bias) = &layer.bias {
        out.extend(host_values(bias.val())?);
    }
    Ok(())
}

pub mod prelude {
    pub use super::{ConvAutoencoder, ConvAutoencoderConfig, ModelError, Reconstruct};
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn latent_is_quarter_resolution_with_four_channels() {
        let device = Default::default();
        let model = ConvAutoencoder::<B>::new(ConvAutoencoderConfig::default(), &device);
        let latent = model.encode(Tensor::zeros([2, 1, 16, 12], &device));
        assert_eq!(latent.dims(), [2, 4, 4, 3]);
    }

    #[test]
    fn parameter_count_matches_layer_shapes() {
        let device = Default::default();
        let model = ConvAutoencoder::<B>::new(ConvAutoencoderConfig::default(), &device);
        // conv1: 16*1*3*3 + 16, conv2: 4*16*3*3 + 4, t_conv1: 4*16*2*2 + 16, t_conv2: 16*1*2*2 + 1
        let expected = (144 + 16) + (576 + 4) + (256 + 16) + (64 + 1);
        assert_eq!(model.num_params(), expected);
        let values = model.parameter_values().unwrap();
        assert_eq!(values.len(), expected);
        assert!(values.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(validate_input_dims([1, 1, 28, 28]).is_ok());
        assert!(validate_input_dims([0, 1, 28, 28]).is_err());
        assert!(validate_input_dims([1, 3, 28, 28]).is_err());
        assert!(validate_input_dims([1, 1, 30, 28]).is_err());
        assert!(validate_input_dims([1, 1, 28, 0]).is_err());
    }
}
