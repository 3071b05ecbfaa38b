//! First-order meta-learning of the latent initialization.
//!
//! Every batch starts from the single outer latent set. A few plain gradient
//! steps adapt a copy per signal (the inner loop); the loss of the adapted
//! latents then updates the field and, through a straight-through estimator,
//! the outer latents. Second-order terms are dropped.

use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::config::{FitConfig, MetaConfig};
use crate::error::{NeuralEnfError, Result};
use crate::latents::{PositionOrientationFeatureAutodecoderMeta, RawLatents};
use crate::nn::EquivariantCrossAttentionEnf;

use super::fitter::{loss_value, reconstruct};
use super::metrics::TrainMetrics;

/// Meta-learns a field together with a shared latent initialization.
pub struct MetaFitter<B, OE, OL>
where
    B: AutodiffBackend,
    OE: Optimizer<EquivariantCrossAttentionEnf<B>, B>,
    OL: Optimizer<PositionOrientationFeatureAutodecoderMeta<B>, B>,
{
    enf: EquivariantCrossAttentionEnf<B>,
    inner: PositionOrientationFeatureAutodecoderMeta<B>,
    outer: PositionOrientationFeatureAutodecoderMeta<B>,
    enf_optimizer: OE,
    outer_optimizer: OL,
    fit: FitConfig,
    meta: MetaConfig,
    step: usize,
}

/// A [`MetaFitter`] with Adam for the field and the outer latents.
pub fn adam_meta_fitter<B: AutodiffBackend>(
    enf: EquivariantCrossAttentionEnf<B>,
    inner: PositionOrientationFeatureAutodecoderMeta<B>,
    outer: PositionOrientationFeatureAutodecoderMeta<B>,
    fit: FitConfig,
    meta: MetaConfig,
) -> Result<
    MetaFitter<
        B,
        impl Optimizer<EquivariantCrossAttentionEnf<B>, B>,
        impl Optimizer<PositionOrientationFeatureAutodecoderMeta<B>, B>,
    >,
> {
    MetaFitter::new(
        enf,
        inner,
        outer,
        AdamConfig::new().init::<B, EquivariantCrossAttentionEnf<B>>(),
        AdamConfig::new().init::<B, PositionOrientationFeatureAutodecoderMeta<B>>(),
        fit,
        meta,
    )
}

impl<B, OE, OL> MetaFitter<B, OE, OL>
where
    B: AutodiffBackend,
    OE: Optimizer<EquivariantCrossAttentionEnf<B>, B>,
    OL: Optimizer<PositionOrientationFeatureAutodecoderMeta<B>, B>,
{
    /// Create a meta fitter from its parts.
    ///
    /// `outer` must hold exactly one latent set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enf: EquivariantCrossAttentionEnf<B>,
        inner: PositionOrientationFeatureAutodecoderMeta<B>,
        outer: PositionOrientationFeatureAutodecoderMeta<B>,
        enf_optimizer: OE,
        outer_optimizer: OL,
        fit: FitConfig,
        meta: MetaConfig,
    ) -> Result<Self> {
        if outer.num_signals() != 1 {
            return Err(NeuralEnfError::invalid_config(format!(
                "outer autodecoder must hold one latent set, got {}",
                outer.num_signals()
            )));
        }
        Ok(Self {
            enf,
            inner,
            outer,
            enf_optimizer,
            outer_optimizer,
            fit,
            meta,
            step: 0,
        })
    }

    /// The field being fitted.
    pub fn enf(&self) -> &EquivariantCrossAttentionEnf<B> {
        &self.enf
    }

    /// Latents adapted in the last step, one set per signal of that batch.
    pub fn inner(&self) -> &PositionOrientationFeatureAutodecoderMeta<B> {
        &self.inner
    }

    /// The learned initialization.
    pub fn outer(&self) -> &PositionOrientationFeatureAutodecoderMeta<B> {
        &self.outer
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Run the inner loop from the outer initialization.
    ///
    /// Returns the initialization as broadcast to the batch (still attached to
    /// the outer parameters) and the adapted latents (detached leaves).
    pub fn adapt(
        &self,
        coords: Tensor<B, 3>,
        targets: Tensor<B, 3>,
    ) -> Result<(RawLatents<B>, RawLatents<B>)> {
        let batch_size = coords.dims()[0];
        let init = self.outer.broadcast_raw(batch_size);
        let mut adapted = init.clone().detach().require_grad();

        for _ in 0..self.meta.num_inner_steps {
            let latents = adapted.clone().embed();
            let (_, loss) = reconstruct(&self.enf, &latents, coords.clone(), targets.clone())?;
            loss_value(&loss)?;

            let grads = loss.backward();
            adapted = adapted.sgd_step(&grads, self.meta.inner_learning_rate);
        }

        Ok((init, adapted.detach()))
    }

    /// One outer step on a batch of signals.
    ///
    /// The batch must match the inner autodecoder's size.
    pub fn step(&mut self, coords: Tensor<B, 3>, targets: Tensor<B, 3>) -> Result<TrainMetrics> {
        let batch_size = coords.dims()[0];
        if batch_size != self.inner.num_signals() {
            return Err(NeuralEnfError::ShapeMismatch {
                context: "meta-learning batch",
                expected: vec![self.inner.num_signals()],
                got: vec![batch_size],
            });
        }

        let (init, adapted) = self.adapt(coords.clone(), targets.clone())?;
        let latents = init.straight_through(adapted.clone()).embed();
        let (_, loss) = reconstruct(&self.enf, &latents, coords, targets)?;
        let value = loss_value(&loss)?;

        let mut grads = loss.backward();
        let enf_grads = GradientsParams::from_module(&mut grads, &self.enf);
        let outer_grads = GradientsParams::from_module(&mut grads, &self.outer);

        self.enf = self
            .enf_optimizer
            .step(self.fit.learning_rate_enf, self.enf.clone(), enf_grads);
        self.outer = self.outer_optimizer.step(
            self.fit.learning_rate_latents,
            self.outer.clone(),
            outer_grads,
        );
        self.inner = self.inner.clone().load_raw(adapted)?;

        self.step += 1;
        let metrics = TrainMetrics::new(self.step, value, batch_size);
        if self.fit.log_interval > 0 && self.step % self.fit.log_interval == 0 {
            metrics.log("meta");
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latents::AutodecoderConfig;
    use crate::nn::{EmbeddingKind, EquivariantCrossAttentionEnfConfig};
    use crate::training::data::{batch_coordinates, coordinate_grid};
    use burn::backend::{Autodiff, NdArray};
    use enf_core::InvariantKind;

    type TestBackend = Autodiff<NdArray>;

    fn parts(
        batch_size: usize,
    ) -> (
        EquivariantCrossAttentionEnf<TestBackend>,
        PositionOrientationFeatureAutodecoderMeta<TestBackend>,
        PositionOrientationFeatureAutodecoderMeta<TestBackend>,
    ) {
        let device = Default::default();
        let enf = EquivariantCrossAttentionEnfConfig {
            num_hidden: 16,
            num_heads: 2,
            num_self_att_layers: 1,
            num_out: 1,
            latent_dim: 8,
            self_attn_invariant: InvariantKind::Ponita2d,
            cross_attn_invariant: InvariantKind::PonitaPos2d,
            embedding_type: EmbeddingKind::Rff,
            embedding_freq_multiplier: [0.2, 1.0],
            condition_value_transform: true,
            top_k_latent_sampling: 4,
        }
        .init(&device)
        .unwrap();
        let inner = AutodecoderConfig::new(batch_size, 4, 8)
            .init_meta(&device)
            .unwrap();
        let outer = AutodecoderConfig::new(1, 4, 8).init_meta(&device).unwrap();
        (enf, inner, outer)
    }

    fn batch(batch_size: usize) -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 3>) {
        let device = Default::default();
        let coords = batch_coordinates(coordinate_grid::<TestBackend>(4, 4, &device), batch_size);
        let targets = coords.clone().narrow(2, 1, 1).abs();
        (coords, targets)
    }

    #[test]
    fn test_inner_loop_improves_batch() {
        let (enf, inner, outer) = parts(2);
        let meta = MetaConfig::new().with_inner_learning_rate(0.1).with_num_inner_steps(3);
        let fitter = adam_meta_fitter(enf, inner, outer, FitConfig::new(), meta).unwrap();
        let (coords, targets) = batch(2);

        let (init, adapted) = fitter.adapt(coords.clone(), targets.clone()).unwrap();
        let loss_of = |raw: RawLatents<TestBackend>| {
            let (_, loss) = reconstruct(fitter.enf(), &raw.embed(), coords.clone(), targets.clone())
                .unwrap();
            loss_value(&loss).unwrap()
        };

        assert!(loss_of(adapted) < loss_of(init.detach()));
    }

    #[test]
    fn test_step_updates_outer_and_inner() {
        let (enf, inner, outer) = parts(2);
        let before: Vec<f32> = outer.broadcast_raw(1).features.to_data().to_vec().unwrap();

        let mut fitter =
            adam_meta_fitter(enf, inner, outer, FitConfig::new().with_log_interval(0), MetaConfig::new())
                .unwrap();
        let (coords, targets) = batch(2);

        let metrics = fitter.step(coords, targets).unwrap();
        assert!(metrics.loss.is_finite());
        assert_eq!(fitter.steps(), 1);

        let after: Vec<f32> = fitter.outer().broadcast_raw(1).features.to_data().to_vec().unwrap();
        assert_ne!(before, after);
        assert_eq!(fitter.inner().num_signals(), 2);
    }

    #[test]
    fn test_rejects_wrong_batch_size() {
        let (enf, inner, outer) = parts(2);
        let mut fitter =
            adam_meta_fitter(enf, inner, outer, FitConfig::new(), MetaConfig::new()).unwrap();
        let (coords, targets) = batch(3);

        assert!(fitter.step(coords, targets).is_err());
    }

    #[test]
    fn test_rejects_multi_set_outer() {
        let (enf, inner, _) = parts(2);
        let device = Default::default();
        let outer = AutodecoderConfig::new(2, 4, 8).init_meta(&device).unwrap();

        assert!(adam_meta_fitter(enf, inner, outer, FitConfig::new(), MetaConfig::new()).is_err());
    }
}
