//! Ponita invariants for SE(2).
//!
//! `a(x, p) = φ(p⁻¹ x)`: the input is expressed in the frame of each latent.

use burn::prelude::*;

use enf_core::{InvariantDims, InvariantKind};

use super::{relative_positions, Invariant};

/// Relative position of bare 2D coordinates in the frame of oriented latents.
///
/// - `x`: `[batch, num_coords, 2]`
/// - `p`: `[batch, num_latents, 4]` as `[x, y, cos θ, sin θ]`
/// - output: `[batch, num_coords, num_latents, 2]`
#[derive(Debug, Clone, Copy, Default)]
pub struct PonitaPos2d;

/// Relative position and heading of oriented 2D poses in the frame of oriented latents.
///
/// - `x`: `[batch, num_coords, 4]`
/// - `p`: `[batch, num_latents, 4]`
/// - output: `[batch, num_coords, num_latents, 3]`, the third feature being
///   `cos(θx − θp)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ponita2d;

/// `[r·o, −r₀o₁ + r₁o₀]` for `r = x − p.pos`, `o = p.ori`.
fn rotate_into_frame<B: Backend>(rel: Tensor<B, 4>, p_ori: Tensor<B, 4>) -> Tensor<B, 4> {
    let r0 = rel.clone().narrow(3, 0, 1);
    let r1 = rel.narrow(3, 1, 1);
    let o0 = p_ori.clone().narrow(3, 0, 1);
    let o1 = p_ori.narrow(3, 1, 1);

    let along = r0.clone() * o0.clone() + r1.clone() * o1.clone();
    let across = r1 * o0 - r0 * o1;

    Tensor::cat(vec![along, across], 3)
}

impl Invariant for PonitaPos2d {
    fn dims(&self) -> InvariantDims {
        InvariantKind::PonitaPos2d.dims()
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        // Latent orientations broadcast over coordinates: [batch, 1, num_latents, 2]
        let p_ori = p.clone().narrow(2, 2, 2).unsqueeze_dim::<4>(1);
        let rel = relative_positions(x, p, 2);

        rotate_into_frame(rel, p_ori)
    }
}

impl Invariant for Ponita2d {
    fn dims(&self) -> InvariantDims {
        InvariantKind::Ponita2d.dims()
    }

    fn compute_unchecked<B: Backend>(&self, x: Tensor<B, 3>, p: Tensor<B, 3>) -> Tensor<B, 4> {
        let x_ori = x.clone().narrow(2, 2, 2).unsqueeze_dim::<4>(2);
        let p_ori = p.clone().narrow(2, 2, 2).unsqueeze_dim::<4>(1);
        let rel = relative_positions(x, p, 2);

        let position = rotate_into_frame(rel, p_ori.clone());
        let heading = (x_ori * p_ori).sum_dim(3);

        Tensor::cat(vec![position, heading], 3)
    }
}
