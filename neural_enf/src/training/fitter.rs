//! Autodecoding: fitting the field and one latent set per signal.

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;

use crate::config::FitConfig;
use crate::error::{NeuralEnfError, Result};
use crate::latents::{Latents, PositionOrientationFeatureAutodecoder};
use crate::nn::EquivariantCrossAttentionEnf;

use super::loss::reconstruction_loss;
use super::metrics::TrainMetrics;

/// Scalar value of a loss, rejecting NaN and infinities.
pub(crate) fn loss_value<B: Backend>(loss: &Tensor<B, 1>) -> Result<f32> {
    let value: f32 = loss.clone().into_scalar().elem();
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NeuralEnfError::TrainingError {
            message: format!("non-finite loss {}", value),
        })
    }
}

/// Field output and reconstruction loss for a batch of latents.
pub fn reconstruct<B: Backend>(
    enf: &EquivariantCrossAttentionEnf<B>,
    latents: &Latents<B>,
    coords: Tensor<B, 3>,
    targets: Tensor<B, 3>,
) -> Result<(Tensor<B, 3>, Tensor<B, 1>)> {
    let predictions = enf.forward(coords, latents)?;
    let loss = reconstruction_loss(predictions.clone(), targets)?;
    Ok((predictions, loss))
}

/// Jointly optimizes a field and the autodecoder of its training signals.
///
/// The field and the latents each have their own optimizer and learning rate.
pub struct Fitter<B, OE, OL>
where
    B: AutodiffBackend,
    OE: Optimizer<EquivariantCrossAttentionEnf<B>, B>,
    OL: Optimizer<PositionOrientationFeatureAutodecoder<B>, B>,
{
    enf: EquivariantCrossAttentionEnf<B>,
    autodecoder: PositionOrientationFeatureAutodecoder<B>,
    enf_optimizer: OE,
    latent_optimizer: OL,
    config: FitConfig,
    step: usize,
}

/// A [`Fitter`] with Adam for both the field and the latents.
pub fn adam_fitter<B: AutodiffBackend>(
    enf: EquivariantCrossAttentionEnf<B>,
    autodecoder: PositionOrientationFeatureAutodecoder<B>,
    config: FitConfig,
) -> Fitter<
    B,
    impl Optimizer<EquivariantCrossAttentionEnf<B>, B>,
    impl Optimizer<PositionOrientationFeatureAutodecoder<B>, B>,
> {
    Fitter::new(
        enf,
        autodecoder,
        AdamConfig::new().init::<B, EquivariantCrossAttentionEnf<B>>(),
        AdamConfig::new().init::<B, PositionOrientationFeatureAutodecoder<B>>(),
        config,
    )
}

impl<B, OE, OL> Fitter<B, OE, OL>
where
    B: AutodiffBackend,
    OE: Optimizer<EquivariantCrossAttentionEnf<B>, B>,
    OL: Optimizer<PositionOrientationFeatureAutodecoder<B>, B>,
{
    /// Create a fitter from its parts.
    pub fn new(
        enf: EquivariantCrossAttentionEnf<B>,
        autodecoder: PositionOrientationFeatureAutodecoder<B>,
        enf_optimizer: OE,
        latent_optimizer: OL,
        config: FitConfig,
    ) -> Self {
        Self {
            enf,
            autodecoder,
            enf_optimizer,
            latent_optimizer,
            config,
            step: 0,
        }
    }

    /// The field being fitted.
    pub fn enf(&self) -> &EquivariantCrossAttentionEnf<B> {
        &self.enf
    }

    /// The training latents.
    pub fn autodecoder(&self) -> &PositionOrientationFeatureAutodecoder<B> {
        &self.autodecoder
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Hand back the fitted field and latents.
    pub fn into_parts(
        self,
    ) -> (
        EquivariantCrossAttentionEnf<B>,
        PositionOrientationFeatureAutodecoder<B>,
    ) {
        (self.enf, self.autodecoder)
    }

    /// One optimization step on the signals `indices`.
    ///
    /// - `coords`: `[batch, num_coords, num_in]`
    /// - `targets`: `[batch, num_coords, num_out]`
    pub fn step(
        &mut self,
        indices: Tensor<B, 1, Int>,
        coords: Tensor<B, 3>,
        targets: Tensor<B, 3>,
    ) -> Result<TrainMetrics> {
        let batch_size = indices.dims()[0];
        let latents = self.autodecoder.forward(indices)?;
        let (_, loss) = reconstruct(&self.enf, &latents, coords, targets)?;
        let value = loss_value(&loss)?;

        let mut grads = loss.backward();
        let enf_grads = GradientsParams::from_module(&mut grads, &self.enf);
        let latent_grads = GradientsParams::from_module(&mut grads, &self.autodecoder);

        self.enf = self
            .enf_optimizer
            .step(self.config.learning_rate_enf, self.enf.clone(), enf_grads);
        self.autodecoder = self.latent_optimizer.step(
            self.config.learning_rate_latents,
            self.autodecoder.clone(),
            latent_grads,
        );

        self.step += 1;
        let metrics = TrainMetrics::new(self.step, value, batch_size);
        if self.config.log_interval > 0 && self.step % self.config.log_interval == 0 {
            metrics.log("fit");
        }
        Ok(metrics)
    }
}

/// Fit latents of unseen signals against a frozen field.
///
/// Only `autodecoder` is updated; returns it with the last loss.
#[allow(clippy::too_many_arguments)]
pub fn fit_latents<B, O>(
    enf: &EquivariantCrossAttentionEnf<B>,
    mut autodecoder: PositionOrientationFeatureAutodecoder<B>,
    optimizer: &mut O,
    learning_rate: f64,
    indices: Tensor<B, 1, Int>,
    coords: Tensor<B, 3>,
    targets: Tensor<B, 3>,
    num_steps: usize,
) -> Result<(PositionOrientationFeatureAutodecoder<B>, f32)>
where
    B: AutodiffBackend,
    O: Optimizer<PositionOrientationFeatureAutodecoder<B>, B>,
{
    // Field parameters stay constant so their gradients are never tracked.
    let frozen = enf.clone().no_grad();
    let mut last = f32::NAN;

    for _ in 0..num_steps {
        let latents = autodecoder.forward(indices.clone())?;
        let (_, loss) = reconstruct(&frozen, &latents, coords.clone(), targets.clone())?;
        last = loss_value(&loss)?;

        let mut grads = loss.backward();
        let latent_grads = GradientsParams::from_module(&mut grads, &autodecoder);
        autodecoder = optimizer.step(learning_rate, autodecoder, latent_grads);
    }

    log::debug!("Fitted latents in {} steps, loss {:.6}", num_steps, last);
    Ok((autodecoder, last))
}

/// Evaluate a field on latents without tracking gradients.
pub fn evaluate<B: AutodiffBackend>(
    enf: &EquivariantCrossAttentionEnf<B>,
    latents: &Latents<B>,
    coords: Tensor<B, 3>,
    targets: Tensor<B, 3>,
) -> Result<f32> {
    let enf = enf.valid();
    let latents = Latents {
        poses: latents.poses.clone().inner(),
        context: latents.context.clone().inner(),
        window: latents.window.clone().inner(),
    };
    let (_, loss) = reconstruct(&enf, &latents, coords.inner(), targets.inner())?;
    loss_value(&loss)
}
