//! Batched pose-pair invariants on Burn tensors.
//!
//! Each invariant maps input coordinates `x: [batch, num_x, x_width]` and latent
//! poses `p: [batch, num_z, z_width]` to `[batch, num_x, num_z, dim]`, using the
//! embedded layout `[pos.., cos θ, sin θ]` from [`enf_core::InvariantDims`].
//! The formulas are the tensor versions of those in [`enf_core::invariant`].

mod ponita;
mod position;

use burn::prelude::*;

use enf_core::{InvariantDims, InvariantKind};

use crate::config::NefConfig;
use crate::error::{NeuralEnfError, Result};

pub use ponita::{Ponita2d, PonitaPos2d};
pub use position::{AbsolutePosition, NormRelativePosition, RelativePosition};

/// A function of two sets of poses that is unchanged under a joint group action.
pub trait Invariant {
    /// Dimension bookkeeping.
    fn dims(&self) -> InvariantDims;

    /// Evaluate without validating shapes.
    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4>;

    /// Evaluate after checking batch sizes and coordinate widths.
    fn compute<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Result<Tensor<B, 4>> {
        check_shapes(&self.dims(), &x.dims(), &p.dims())?;
        Ok(self.compute_unchecked(x, p))
    }
}

fn check_shapes(dims: &InvariantDims, x: &[usize; 3], p: &[usize; 3]) -> Result<()> {
    if x[2] != dims.x_embedding_dim() {
        return Err(NeuralEnfError::ShapeMismatch {
            context: "invariant input coordinates",
            expected: vec![x[0], x[1], dims.x_embedding_dim()],
            got: x.to_vec(),
        });
    }
    if p[2] != dims.z_embedding_dim() || p[0] != x[0] {
        return Err(NeuralEnfError::ShapeMismatch {
            context: "invariant latent poses",
            expected: vec![x[0], p[1], dims.z_embedding_dim()],
            got: p.to_vec(),
        });
    }
    Ok(())
}

/// `x_pos − p_pos` broadcast to `[batch, num_x, num_z, n]`.
pub(crate) fn relative_positions<B: Backend>(
    x: Tensor<B, 3>,
    p: Tensor<B, 3>,
    n: usize,
) -> Tensor<B, 4> {
    let x_pos = x.narrow(2, 0, n).unsqueeze_dim::<4>(2);
    let p_pos = p.narrow(2, 0, n).unsqueeze_dim::<4>(1);
    x_pos - p_pos
}

/// Squared positional distance `‖x_pos − p_pos‖²` as `[batch, num_x, num_z, 1]`.
///
/// Used for the Gaussian window and nearest-latent selection; it is an SE(n)
/// invariant whatever invariant the attention itself uses.
pub fn pairwise_sq_distance<B: Backend>(
    x: Tensor<B, 3>,
    p: Tensor<B, 3>,
    num_pos_dims: usize,
) -> Tensor<B, 4> {
    relative_positions(x, p, num_pos_dims)
        .powf_scalar(2.0)
        .sum_dim(3)
}

impl Invariant for InvariantKind {
    fn dims(&self) -> InvariantDims {
        InvariantKind::dims(self)
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        match *self {
            InvariantKind::PonitaPos2d => PonitaPos2d.compute_unchecked(x, p),
            InvariantKind::Ponita2d => Ponita2d.compute_unchecked(x, p),
            InvariantKind::RelativePosition(n) => RelativePosition::new(n).compute_unchecked(x, p),
            InvariantKind::AbsolutePosition(n) => AbsolutePosition::new(n).compute_unchecked(x, p),
            InvariantKind::NormRelativePosition(n) => {
                NormRelativePosition::new(n).compute_unchecked(x, p)
            }
        }
    }
}

/// Invariant for latent-to-latent self-attention.
///
/// Latents carry an orientation, so `ponita` resolves to the full [`Ponita2d`].
pub fn get_sa_invariant(config: &NefConfig) -> Result<InvariantKind> {
    let kind = config.invariant()?.self_attention(config.num_in);
    log::debug!("Self-attention invariant: {:?}", kind);
    Ok(kind)
}

/// Invariant for coordinate-to-latent cross-attention.
///
/// Input coordinates are bare positions, so `ponita` resolves to [`PonitaPos2d`].
pub fn get_ca_invariant(config: &NefConfig) -> Result<InvariantKind> {
    let kind = config.invariant()?.cross_attention(config.num_in);
    log::debug!("Cross-attention invariant: {:?}", kind);
    Ok(kind)
}
