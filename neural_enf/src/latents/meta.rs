//! Latent storage for meta-learning.
//!
//! Two roles share this type: the outer autodecoder holds a single latent set
//! (the learned initialization, trained with the field), and the inner
//! autodecoder holds one set per signal in a batch, adapted from that
//! initialization by a few gradient steps.

use burn::module::Module;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use super::{AutodecoderConfig, Latents, PositionOrientationFeatureAutodecoder, RawLatents};
use crate::error::Result;

/// Position-orientation-feature latents with meta-learning helpers.
#[derive(Module, Debug)]
pub struct PositionOrientationFeatureAutodecoderMeta<B: Backend> {
    storage: PositionOrientationFeatureAutodecoder<B>,
}

impl AutodecoderConfig {
    /// Initialize a meta-learning autodecoder.
    pub fn init_meta<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<PositionOrientationFeatureAutodecoderMeta<B>> {
        Ok(PositionOrientationFeatureAutodecoderMeta {
            storage: self.init(device)?,
        })
    }
}

impl<B: Backend> PositionOrientationFeatureAutodecoderMeta<B> {
    /// Number of stored latent sets.
    pub fn num_signals(&self) -> usize {
        self.storage.num_signals()
    }

    /// Latents per set.
    pub fn num_latents(&self) -> usize {
        self.storage.num_latents()
    }

    /// Width of the context vectors.
    pub fn latent_dim(&self) -> usize {
        self.storage.latent_dim()
    }

    /// Orientation angles per latent.
    pub fn num_ori_dims(&self) -> usize {
        self.storage.num_ori_dims()
    }

    /// Latents of the selected sets.
    pub fn forward(&self, indices: Tensor<B, 1, Int>) -> Result<Latents<B>> {
        self.storage.forward(indices)
    }

    /// Un-embedded latents of the selected sets.
    pub fn raw(&self, indices: Tensor<B, 1, Int>) -> Result<RawLatents<B>> {
        self.storage.raw(indices)
    }

    /// Replace the stored sets with `raw`, which must match their shapes.
    pub fn load_raw(self, raw: RawLatents<B>) -> Result<Self> {
        Ok(Self {
            storage: self.storage.load_raw(raw)?,
        })
    }

    /// The first latent set repeated `batch_size` times, un-embedded.
    ///
    /// Gradients flowing into the copies accumulate on the shared set.
    pub fn broadcast_raw(&self, batch_size: usize) -> RawLatents<B> {
        let indices = Tensor::<B, 1, Int>::zeros([batch_size], &self.storage.device());
        self.storage.raw_all().select(indices)
    }

    /// The first latent set repeated `batch_size` times.
    pub fn broadcast(&self, batch_size: usize) -> Latents<B> {
        self.broadcast_raw(batch_size).embed()
    }
}

impl<B: AutodiffBackend> RawLatents<B> {
    /// One plain gradient-descent step on every tensor.
    ///
    /// The result is a fresh leaf that collects gradients; tensors without a
    /// gradient in `grads` are kept as they are.
    pub fn sgd_step(self, grads: &B::Gradients, learning_rate: f64) -> Self {
        self.map(|t| {
            let updated = match t.grad(grads) {
                Some(grad) => Tensor::from_inner(t.inner() - grad.mul_scalar(learning_rate)),
                None => t.detach(),
            };
            updated.require_grad()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    #[test]
    fn test_broadcast_tiles_single_set() {
        let device = Default::default();
        let outer = AutodecoderConfig::new(1, 9, 16)
            .init_meta::<TestBackend>(&device)
            .unwrap();

        let latents = outer.broadcast(4);
        assert_eq!(latents.poses.dims(), [4, 9, 4]);
        assert_eq!(latents.context.dims(), [4, 9, 16]);

        let poses: Vec<f32> = latents.poses.to_data().to_vec().unwrap();
        let per_signal = 9 * 4;
        for b in 1..4 {
            assert_eq!(&poses[..per_signal], &poses[b * per_signal..(b + 1) * per_signal]);
        }
    }

    #[test]
    fn test_sgd_step_descends() {
        type AutodiffBackend = Autodiff<NdArray>;
        let device = Default::default();
        let outer = AutodecoderConfig::new(1, 4, 2)
            .init_meta::<AutodiffBackend>(&device)
            .unwrap();

        let raw = outer.broadcast_raw(2).detach().require_grad();
        let loss = raw.features.clone().powf_scalar(2.0).sum();
        let grads = loss.backward();

        // d/df f² = 2f = 2 at the all-ones initialization.
        let stepped = raw.sgd_step(&grads, 0.25);
        let features: Vec<f32> = stepped.features.to_data().to_vec().unwrap();
        assert!(features.iter().all(|&f| (f - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_inner_autodecoder_has_batch_sets() {
        let device = Default::default();
        let inner = AutodecoderConfig::new(8, 4, 16)
            .init_meta::<TestBackend>(&device)
            .unwrap();

        assert_eq!(inner.num_signals(), 8);
        let indices = Tensor::<TestBackend, 1, Int>::from_data([0, 7], &device);
        assert_eq!(inner.forward(indices).unwrap().batch_size(), 2);
    }
}
