//! Coordinate grids for sampled signals.

use burn::prelude::*;

/// Pixel coordinates of a `height × width` image in `[-1, 1]²`.
///
/// Returns `[height · width, 2]` in row-major order, each row `(x, y)` with `x`
/// running along the width. A side of length 1 maps to 0.
pub fn coordinate_grid<B: Backend>(height: usize, width: usize, device: &B::Device) -> Tensor<B, 2> {
    let axis = |n: usize, i: usize| {
        if n > 1 {
            -1.0 + 2.0 * i as f32 / (n - 1) as f32
        } else {
            0.0
        }
    };

    let coords: Vec<f32> = (0..height)
        .flat_map(|row| (0..width).flat_map(move |col| [axis(width, col), axis(height, row)]))
        .collect();

    Tensor::from_data(TensorData::new(coords, [height * width, 2]), device)
}

/// The same coordinates for every signal of a batch: `[batch, num_coords, dim]`.
pub fn batch_coordinates<B: Backend>(coords: Tensor<B, 2>, batch_size: usize) -> Tensor<B, 3> {
    coords.unsqueeze_dim::<3>(0).repeat_dim(0, batch_size)
}
