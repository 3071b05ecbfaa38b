//! Fitting fields to signals.
//!
//! This module provides:
//! - `Fitter`: autodecoding, one optimized latent set per training signal
//! - `MetaFitter`: first-order meta-learning of a shared latent initialization
//! - Reconstruction loss and metrics
//! - Coordinate grids for image-like signals

mod data;
mod fitter;
mod loss;
mod meta;
mod metrics;

pub use data::{batch_coordinates, coordinate_grid};
pub use fitter::{adam_fitter, evaluate, fit_latents, reconstruct, Fitter};
pub use loss::{psnr, reconstruction_loss};
pub use meta::{adam_meta_fitter, MetaFitter};
pub use metrics::{MetricsTracker, TrainMetrics};
