//! Reconstruction loss and error.

use crate::error::TrainError;
use burn::nn::loss::{MseLoss, Reduction};
use burn::tensor::{backend::Backend, ElementConversion, Tensor};

fn check_same_shape<B: Backend>(
    recon: &Tensor<B, 4>,
    input: &Tensor<B, 4>,
) -> Result<(), TrainError> {
    let (recon_dims, input_dims) = (recon.dims(), input.dims());
    if recon_dims != input_dims {
        return Err(TrainError::ShapeMismatch {
            recon: recon_dims,
            input: input_dims,
        });
    }
    Ok(())
}

/// Mean squared per-element difference.
pub fn reconstruction_loss<B: Backend>(
    recon: Tensor<B, 4>,
    input: Tensor<B, 4>,
) -> Result<Tensor<B, 1>, TrainError> {
    check_same_shape(&recon, &input)?;
    Ok(MseLoss::new().forward(recon, input, Reduction::Mean))
}

/// Mean absolute per-element difference, reported as the epoch "error".
pub fn reconstruction_error<B: Backend>(
    recon: Tensor<B, 4>,
    input: Tensor<B, 4>,
) -> Result<Tensor<B, 1>, TrainError> {
    check_same_shape(&recon, &input)?;
    Ok((recon - input).abs().mean())
}

pub fn scalar<B: Backend>(value: Tensor<B, 1>) -> f64 {
    value.into_scalar().elem::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn identical_tensors_have_zero_loss() {
        let device = Default::default();
        let x = Tensor::<B, 4>::random([2, 1, 8, 8], Distribution::Default, &device);
        let loss = scalar(reconstruction_loss(x.clone(), x.clone()).unwrap());
        assert_eq!(loss, 0.0);
        assert_eq!(scalar(reconstruction_error(x.clone(), x).unwrap()), 0.0);
    }

    #[test]
    fn loss_is_mean_of_squared_differences() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 1, 2, 2], &device);
        let b = Tensor::<B, 4>::from_floats([[[[1.0, -1.0], [2.0, 0.0]]]], &device);
        let loss = scalar(reconstruction_loss(a.clone(), b.clone()).unwrap());
        assert!((loss - 1.5).abs() < 1e-6);
        let err = scalar(reconstruction_error(a, b).unwrap());
        assert!((err - 1.0).abs() < 1e-6);
    }

    #[test]
    fn loss_is_non_negative() {
        let device = Default::default();
        for _ in 0..5 {
            let dist = Distribution::Uniform(-3.0, 3.0);
            let a = Tensor::<B, 4>::random([1, 1, 4, 4], dist, &device);
            let b = Tensor::<B, 4>::random([1, 1, 4, 4], dist, &device);
            assert!(scalar(reconstruction_loss(a, b).unwrap()) >= 0.0);
        }
    }

    #[test]
    fn mismatched_shapes_fail() {
        let device = Default::default();
        let a = Tensor::<B, 4>::zeros([1, 1, 4, 4], &device);
        let b = Tensor::<B, 4>::zeros([1, 1, 8, 4], &device);
        match reconstruction_loss(a, b) {
            Err(TrainError::ShapeMismatch { recon, input }) => {
                assert_eq!(recon, [1, 1, 4, 4]);
                assert_eq!(input, [1, 1, 8, 4]);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }
}
