//! Example: Fitting a field to a family of rotated images.
//!
//! This example demonstrates the autodecoding workflow:
//! 1. Render small images of a bar at several rotations
//! 2. Build a field and its latents from an experiment configuration
//! 3. Fit field and latents jointly
//! 4. Rotate the fitted latents and check that the decoded image rotates with them
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -p neural_enf --example fit_rotated_images --features examples
//! ```

use std::f32::consts::{FRAC_PI_2, PI};

use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::ElementConversion;

use neural_enf::latents::RawLatents;
use neural_enf::prelude::*;

type MyBackend = Autodiff<NdArray>;

const SIDE: usize = 16;
const NUM_SIGNALS: usize = 8;

/// A soft bar through the origin at `angle`, sampled on the coordinate grid.
fn render_bar(coords: &[f32], angle: f32) -> Vec<f32> {
    let (sin, cos) = angle.sin_cos();
    coords
        .chunks(2)
        .map(|xy| {
            let along = xy[0] * cos + xy[1] * sin;
            let across = -xy[0] * sin + xy[1] * cos;
            let inside = (-(across / 0.15).powi(2)).exp() * (-(along / 0.7).powi(4)).exp();
            inside.clamp(0.0, 1.0)
        })
        .collect()
}

/// Rotate latent poses by a quarter turn about the origin.
fn quarter_turn(raw: RawLatents<MyBackend>) -> RawLatents<MyBackend> {
    let x = raw.positions.clone().narrow(2, 0, 1);
    let y = raw.positions.narrow(2, 1, 1);
    RawLatents {
        positions: Tensor::cat(vec![y.neg(), x], 2),
        orientations: raw.orientations.map(|a| a.add_scalar(FRAC_PI_2)),
        ..raw
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let device = burn::backend::ndarray::NdArrayDevice::Cpu;

    println!("═══════════════════════════════════════════════════════════════");
    println!("          Equivariant Neural Field: rotated bars");
    println!("═══════════════════════════════════════════════════════════════");

    // =========================================================================
    // Step 1: Render the dataset
    // =========================================================================
    let grid = coordinate_grid::<MyBackend>(SIDE, SIDE, &device);
    let grid_values: Vec<f32> = grid
        .to_data()
        .to_vec()
        .map_err(|e| NeuralEnfError::TrainingError {
            message: format!("{:?}", e),
        })?;

    let pixels: Vec<f32> = (0..NUM_SIGNALS)
        .flat_map(|i| render_bar(&grid_values, i as f32 * PI / NUM_SIGNALS as f32))
        .collect();
    let images = Tensor::<MyBackend, 3>::from_data(
        TensorData::new(pixels, [NUM_SIGNALS, SIDE * SIDE, 1]),
        &device,
    );
    let coords = batch_coordinates(grid.clone(), NUM_SIGNALS);
    println!("Rendered {} images of {}x{} pixels", NUM_SIGNALS, SIDE, SIDE);

    // =========================================================================
    // Step 2: Build the model
    // =========================================================================
    let nef = NefConfig::new(1)
        .with_num_hidden(32)
        .with_num_heads(2)
        .with_latent_dim(16)
        .with_num_latents(9);
    let config = ExperimentConfig::new(nef, DatasetConfig::new(NUM_SIGNALS, 1))
        .with_fit(FitConfig::new().with_learning_rate_enf(1e-3).with_num_epochs(200).with_log_interval(25));

    let ModelBundle::Standard { enf, train, .. } = get_model::<MyBackend>(&config, &device)? else {
        return Err(NeuralEnfError::invalid_config("expected an autodecoding experiment"));
    };

    // =========================================================================
    // Step 3: Fit
    // =========================================================================
    let indices = Tensor::<MyBackend, 1, Int>::arange(0..NUM_SIGNALS as i64, &device);
    let mut fitter = adam_fitter(enf, train, config.fit.clone());
    let mut last = TrainMetrics::default();
    for _ in 0..config.fit.num_epochs {
        last = fitter.step(indices.clone(), coords.clone(), images.clone())?;
    }
    println!("Final mse {:.5} ({:.1} dB)", last.loss, last.psnr());

    // =========================================================================
    // Step 4: Rotate latents, decode, and compare
    // =========================================================================
    let (enf, train) = fitter.into_parts();
    let first = Tensor::<MyBackend, 1, Int>::from_data([0], &device);
    let raw = train.raw(first)?;

    let rotated = enf.forward(batch_coordinates(grid.clone(), 1), &quarter_turn(raw.clone()).embed())?;

    // Decoding rotated latents at x equals decoding the originals at the inverse-rotated x.
    let x = grid.clone().narrow(1, 0, 1);
    let y = grid.narrow(1, 1, 1);
    let inverse_grid = Tensor::cat(vec![y, x.neg()], 1);
    let reference = enf.forward(batch_coordinates(inverse_grid, 1), &raw.embed())?;

    let change: f32 = (rotated - reference).abs().max().into_scalar().elem();
    println!("Max deviation after a quarter turn: {:.2e}", change);
    log::info!("Done");

    Ok(())
}
