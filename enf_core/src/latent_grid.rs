//! Initial placement of latent poses.
//!
//! Latents start on a regular `side × side` grid covering `[-1, 1]²`, one per
//! cell centre, which is why the latent count must be a perfect square.

use crate::error::EnfCoreError;
use crate::types::Point2;

/// Integer side length of the latent grid.
pub fn latent_grid_side(num_latents: usize) -> Result<usize, EnfCoreError> {
    if num_latents == 0 {
        return Err(EnfCoreError::NonSquareLatentCount { num_latents });
    }
    let side = libm::round(libm::sqrt(num_latents as f64)) as usize;
    if side.checked_mul(side) == Some(num_latents) {
        Ok(side)
    } else {
        Err(EnfCoreError::NonSquareLatentCount { num_latents })
    }
}

/// Spacing between neighbouring latents on a grid of `side` per axis.
#[inline]
pub fn latent_grid_spacing(side: usize) -> f32 {
    2.0 / side as f32
}

/// Cell-centre positions of the latent grid in row-major order (y outer, x inner).
///
/// Coordinates run from `-1 + 1/side` to `1 - 1/side`.
pub fn latent_grid_positions(
    num_latents: usize,
) -> Result<impl Iterator<Item = Point2>, EnfCoreError> {
    let side = latent_grid_side(num_latents)?;
    let step = latent_grid_spacing(side);
    let first = -1.0 + step / 2.0;

    Ok((0..num_latents).map(move |i| {
        let (row, col) = (i / side, i % side);
        Point2::new(first + col as f32 * step, first + row as f32 * step)
    }))
}
