//! Position-only invariants in any dimension.

use burn::prelude::*;

use enf_core::{InvariantDims, InvariantKind};

use super::{relative_positions, Invariant};

/// Added under the square root so the norm stays differentiable at `x = p`.
const NORM_EPS: f32 = 1e-12;

/// `x − p`: invariant to translations only.
#[derive(Debug, Clone, Copy)]
pub struct RelativePosition {
    num_dims: usize,
}

/// `x`: not invariant; a baseline that ignores the latent poses.
#[derive(Debug, Clone, Copy)]
pub struct AbsolutePosition {
    num_dims: usize,
}

/// `‖x − p‖`: invariant to rotations, reflections and translations.
#[derive(Debug, Clone, Copy)]
pub struct NormRelativePosition {
    num_dims: usize,
}

impl RelativePosition {
    /// Create for `num_dims`-dimensional positions.
    pub fn new(num_dims: usize) -> Self {
        Self { num_dims }
    }
}

impl AbsolutePosition {
    /// Create for `num_dims`-dimensional positions.
    pub fn new(num_dims: usize) -> Self {
        Self { num_dims }
    }
}

impl NormRelativePosition {
    /// Create for `num_dims`-dimensional positions.
    pub fn new(num_dims: usize) -> Self {
        Self { num_dims }
    }
}

impl Invariant for RelativePosition {
    fn dims(&self) -> InvariantDims {
        InvariantKind::RelativePosition(self.num_dims).dims()
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        relative_positions(x, p, self.num_dims)
    }
}

impl Invariant for AbsolutePosition {
    fn dims(&self) -> InvariantDims {
        InvariantKind::AbsolutePosition(self.num_dims).dims()
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        let num_latents = p.dims()[1];
        x.narrow(2, 0, self.num_dims)
            .unsqueeze_dim::<4>(2)
            .repeat_dim(2, num_latents)
    }
}

impl Invariant for NormRelativePosition {
    fn dims(&self) -> InvariantDims {
        InvariantKind::NormRelativePosition(self.num_dims).dims()
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        relative_positions(x, p, self.num_dims)
            .powf_scalar(2.0)
            .sum_dim(3)
            .add_scalar(NORM_EPS)
            .sqrt()
    }
}
