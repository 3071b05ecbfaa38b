//! Reconstruction objectives.

use burn::prelude::*;

use crate::error::{NeuralEnfError, Result};

/// Mean squared error between predictions and targets of the same shape.
pub fn reconstruction_loss<B: Backend>(
    predictions: Tensor<B, 3>,
    targets: Tensor<B, 3>,
) -> Result<Tensor<B, 1>> {
    let expected = predictions.dims();
    let got = targets.dims();
    if expected != got {
        return Err(NeuralEnfError::ShapeMismatch {
            context: "reconstruction targets",
            expected: expected.to_vec(),
            got: got.to_vec(),
        });
    }
    Ok((predictions - targets).powf_scalar(2.0).mean())
}

/// Peak signal-to-noise ratio in dB for signals in `[0, 1]`.
pub fn psnr(mse: f32) -> f32 {
    -10.0 * mse.max(f32::EPSILON).log10()
}
