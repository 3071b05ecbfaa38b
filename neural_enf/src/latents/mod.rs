//! Latent point clouds and the autodecoders that store them.
//!
//! A signal is represented by `num_latents` latents, each a pose `p`, a context
//! vector `c` and a Gaussian window `g`. Autodecoders hold one such set per
//! signal as trainable parameters and hand out batches of them by index.

mod autodecoder;
mod meta;

use burn::prelude::*;

use crate::error::{NeuralEnfError, Result};

pub use autodecoder::{AutodecoderConfig, PositionOrientationFeatureAutodecoder};
pub use meta::PositionOrientationFeatureAutodecoderMeta;

/// Smallest window value used in attention, keeping `d² / g` finite.
pub const WINDOW_MIN: f32 = 1e-6;

/// Latents in the layout consumed by the field.
#[derive(Debug, Clone)]
pub struct Latents<B: Backend> {
    /// Embedded poses `[batch, num_latents, pos + 2·ori]` as `[pos.., cos θ.., sin θ..]`.
    pub poses: Tensor<B, 3>,
    /// Context vectors `[batch, num_latents, latent_dim]`.
    pub context: Tensor<B, 3>,
    /// Gaussian window sizes `[batch, num_latents, 1]`, strictly positive.
    pub window: Tensor<B, 3>,
}

impl<B: Backend> Latents<B> {
    /// Number of signals in the batch.
    pub fn batch_size(&self) -> usize {
        self.poses.dims()[0]
    }

    /// Latents per signal.
    pub fn num_latents(&self) -> usize {
        self.poses.dims()[1]
    }

    /// Check that the three tensors agree on batch and latent counts.
    pub fn validate(&self) -> Result<()> {
        let [b, l, _] = self.poses.dims();
        let [cb, cl, cd] = self.context.dims();
        if (cb, cl) != (b, l) {
            return Err(NeuralEnfError::ShapeMismatch {
                context: "latent context",
                expected: vec![b, l, cd],
                got: vec![cb, cl, cd],
            });
        }
        let window = self.window.dims();
        if window != [b, l, 1] {
            return Err(NeuralEnfError::ShapeMismatch {
                context: "latent window",
                expected: vec![b, l, 1],
                got: window.to_vec(),
            });
        }
        Ok(())
    }
}

/// Latents as stored: positions and orientation angles before embedding.
///
/// Meta-learning differentiates with respect to these tensors directly.
#[derive(Debug, Clone)]
pub struct RawLatents<B: Backend> {
    /// Positions `[batch, num_latents, num_pos_dims]`.
    pub positions: Tensor<B, 3>,
    /// Orientation angles `[batch, num_latents, num_ori_dims]`, if the latents are oriented.
    pub orientations: Option<Tensor<B, 3>>,
    /// Context vectors `[batch, num_latents, latent_dim]`.
    pub features: Tensor<B, 3>,
    /// Raw Gaussian windows `[batch, num_latents, 1]`.
    pub window: Tensor<B, 3>,
}

impl<B: Backend> RawLatents<B> {
    /// Convert angles to `(cos, sin)` and clamp windows.
    pub fn embed(self) -> Latents<B> {
        let poses = match self.orientations {
            Some(angles) => Tensor::cat(
                vec![self.positions, angles.clone().cos(), angles.sin()],
                2,
            ),
            None => self.positions,
        };

        Latents {
            poses,
            context: self.features,
            window: self.window.clamp_min(WINDOW_MIN),
        }
    }

    /// Apply `f` to every stored tensor.
    pub fn map(self, f: impl Fn(Tensor<B, 3>) -> Tensor<B, 3>) -> Self {
        Self {
            positions: f(self.positions),
            orientations: self.orientations.map(&f),
            features: f(self.features),
            window: f(self.window),
        }
    }

    /// Cut every tensor from the autodiff graph.
    pub fn detach(self) -> Self {
        self.map(|t| t.detach())
    }

    /// Mark every tensor as a leaf that collects gradients.
    pub fn require_grad(self) -> Self {
        self.map(|t| t.require_grad())
    }

    /// Take the values of `adapted` while passing gradients straight to `self`.
    ///
    /// Evaluates to `self + (adapted − self)` with the difference detached.
    pub fn straight_through(self, adapted: Self) -> Self {
        let pass = |init: Tensor<B, 3>, adapted: Tensor<B, 3>| {
            init.clone() + (adapted.detach() - init.detach())
        };
        Self {
            positions: pass(self.positions, adapted.positions),
            orientations: match (self.orientations, adapted.orientations) {
                (Some(init), Some(adapted)) => Some(pass(init, adapted)),
                (init, _) => init,
            },
            features: pass(self.features, adapted.features),
            window: pass(self.window, adapted.window),
        }
    }

    /// Select signals along the batch dimension.
    pub fn select(self, indices: Tensor<B, 1, Int>) -> Self {
        Self {
            positions: self.positions.select(0, indices.clone()),
            orientations: self.orientations.map(|o| o.select(0, indices.clone())),
            features: self.features.select(0, indices.clone()),
            window: self.window.select(0, indices),
        }
    }
}
