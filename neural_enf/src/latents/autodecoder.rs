//! Per-signal latent storage for autodecoding.

use std::f32::consts::TAU;

use burn::config::Config;
use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

use enf_core::latent_grid_positions;

use super::{Latents, RawLatents};
use crate::error::{self, NeuralEnfError};

/// Configuration for a position-orientation-feature autodecoder.
#[derive(Config, Debug)]
pub struct AutodecoderConfig {
    /// Number of signals (one latent set each).
    pub num_signals: usize,
    /// Latents per signal. Must be a perfect square.
    pub num_latents: usize,
    /// Width of each latent's context vector.
    pub latent_dim: usize,
    /// Positional dimensions of a latent pose.
    #[config(default = 2)]
    pub num_pos_dims: usize,
    /// Orientation dimensions (angles) of a latent pose.
    #[config(default = 1)]
    pub num_ori_dims: usize,
    /// Initial Gaussian window of every latent.
    #[config(default = 0.1)]
    pub gaussian_window_size: f32,
}

impl AutodecoderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> error::Result<()> {
        if self.num_signals == 0 {
            return Err(NeuralEnfError::invalid_config("num_signals must be positive"));
        }
        if self.latent_dim == 0 || self.num_pos_dims == 0 {
            return Err(NeuralEnfError::invalid_config(
                "latent_dim and num_pos_dims must be positive",
            ));
        }
        if self.num_ori_dims > 1 {
            return Err(NeuralEnfError::invalid_config(
                "latent poses carry at most one orientation angle",
            ));
        }
        enf_core::latent_grid_side(self.num_latents)
            .map_err(|e| NeuralEnfError::invalid_config(e.to_string()))?;
        Ok(())
    }

    /// Initial positions `[num_signals, num_latents, num_pos_dims]`.
    ///
    /// Planar latents start on the regular grid, identical for every signal;
    /// other dimensions are drawn uniformly from `[-1, 1]`.
    fn init_positions<B: Backend>(&self, device: &B::Device) -> error::Result<Tensor<B, 3>> {
        let shape = [self.num_signals, self.num_latents, self.num_pos_dims];
        if self.num_pos_dims != 2 {
            return Ok(Tensor::random(shape, Distribution::Uniform(-1.0, 1.0), device));
        }

        let grid: Vec<f32> = latent_grid_positions(self.num_latents)?
            .flat_map(|p| p.as_array())
            .collect();
        let grid = Tensor::<B, 3>::from_data(
            TensorData::new(grid, [1, self.num_latents, 2]),
            device,
        );
        Ok(grid.repeat_dim(0, self.num_signals))
    }

    /// Initialize the autodecoder.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> error::Result<PositionOrientationFeatureAutodecoder<B>> {
        self.validate()?;

        let positions = self.init_positions(device)?;
        let orientations = (self.num_ori_dims > 0).then(|| {
            let angles = Tensor::random(
                [self.num_signals, self.num_latents, self.num_ori_dims],
                Distribution::Uniform(0.0, TAU as f64),
                device,
            );
            Param::from_tensor(angles)
        });
        let features = Tensor::ones([self.num_signals, self.num_latents, self.latent_dim], device);
        let gaussian_window = Tensor::full(
            [self.num_signals, self.num_latents, 1],
            self.gaussian_window_size,
            device,
        );

        log::debug!(
            "Autodecoder: {} signals x {} latents (pos={}, ori={}, dim={})",
            self.num_signals,
            self.num_latents,
            self.num_pos_dims,
            self.num_ori_dims,
            self.latent_dim
        );

        Ok(PositionOrientationFeatureAutodecoder {
            positions: Param::from_tensor(positions),
            orientations,
            features: Param::from_tensor(features),
            gaussian_window: Param::from_tensor(gaussian_window),
        })
    }
}

/// Trainable latent point clouds, one per signal.
///
/// All four tensors are parameters, so poses, contexts and windows are all
/// optimized together with the field.
#[derive(Module, Debug)]
pub struct PositionOrientationFeatureAutodecoder<B: Backend> {
    /// Positions: [num_signals, num_latents, num_pos_dims]
    positions: Param<Tensor<B, 3>>,
    /// Orientation angles: [num_signals, num_latents, num_ori_dims]
    orientations: Option<Param<Tensor<B, 3>>>,
    /// Context vectors: [num_signals, num_latents, latent_dim]
    features: Param<Tensor<B, 3>>,
    /// Gaussian windows: [num_signals, num_latents, 1]
    gaussian_window: Param<Tensor<B, 3>>,
}

impl<B: Backend> PositionOrientationFeatureAutodecoder<B> {
    /// Number of stored signals.
    pub fn num_signals(&self) -> usize {
        self.positions.val().dims()[0]
    }

    /// Latents per signal.
    pub fn num_latents(&self) -> usize {
        self.positions.val().dims()[1]
    }

    /// Width of the context vectors.
    pub fn latent_dim(&self) -> usize {
        self.features.val().dims()[2]
    }

    /// Positional dimensions of a latent.
    pub fn num_pos_dims(&self) -> usize {
        self.positions.val().dims()[2]
    }

    /// Orientation angles per latent.
    pub fn num_ori_dims(&self) -> usize {
        self.orientations
            .as_ref()
            .map(|o| o.val().dims()[2])
            .unwrap_or(0)
    }

    /// Device the parameters live on.
    pub fn device(&self) -> B::Device {
        self.positions.val().device()
    }

    /// Every stored latent set, un-embedded.
    pub fn raw_all(&self) -> RawLatents<B> {
        RawLatents {
            positions: self.positions.val(),
            orientations: self.orientations.as_ref().map(|o| o.val()),
            features: self.features.val(),
            window: self.gaussian_window.val(),
        }
    }

    /// Un-embedded latents of the selected signals.
    pub fn raw(&self, indices: Tensor<B, 1, Int>) -> error::Result<RawLatents<B>> {
        self.check_indices(&indices)?;
        Ok(self.raw_all().select(indices))
    }

    /// Latents of the selected signals, ready for the field.
    pub fn forward(&self, indices: Tensor<B, 1, Int>) -> error::Result<Latents<B>> {
        Ok(self.raw(indices)?.embed())
    }

    /// Replace every stored latent set.
    ///
    /// `raw` must have the same shapes as the current storage.
    pub fn load_raw(self, raw: RawLatents<B>) -> error::Result<Self> {
        let current = self.raw_all();
        let check = |context: &'static str, expected: [usize; 3], got: [usize; 3]| {
            if expected == got {
                Ok(())
            } else {
                Err(NeuralEnfError::ShapeMismatch {
                    context,
                    expected: expected.to_vec(),
                    got: got.to_vec(),
                })
            }
        };
        check("latent positions", current.positions.dims(), raw.positions.dims())?;
        check("latent features", current.features.dims(), raw.features.dims())?;
        check("latent window", current.window.dims(), raw.window.dims())?;
        let orientations = match (current.orientations, raw.orientations) {
            (Some(current), Some(angles)) => {
                check("latent orientations", current.dims(), angles.dims())?;
                Some(Param::from_tensor(angles))
            }
            (None, None) => None,
            (current, _) => {
                return Err(NeuralEnfError::ShapeMismatch {
                    context: "latent orientations",
                    expected: current.map(|c| c.dims().to_vec()).unwrap_or_default(),
                    got: Vec::new(),
                })
            }
        };

        Ok(Self {
            positions: Param::from_tensor(raw.positions),
            orientations,
            features: Param::from_tensor(raw.features),
            gaussian_window: Param::from_tensor(raw.window),
        })
    }

    fn check_indices(&self, indices: &Tensor<B, 1, Int>) -> error::Result<()> {
        let num_signals = self.num_signals();
        let data = indices.to_data();
        for index in data.iter::<i64>() {
            if index < 0 || index as usize >= num_signals {
                return Err(NeuralEnfError::SignalIndexOutOfBounds {
                    index,
                    num_signals,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_autodecoder_shapes() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(10, 16, 32)
            .init::<TestBackend>(&device)
            .unwrap();

        assert_eq!(autodecoder.num_signals(), 10);
        assert_eq!(autodecoder.num_latents(), 16);
        assert_eq!(autodecoder.latent_dim(), 32);
        assert_eq!(autodecoder.num_ori_dims(), 1);

        let indices = Tensor::<TestBackend, 1, Int>::from_data([0, 3, 9], &device);
        let latents = autodecoder.forward(indices).unwrap();

        assert_eq!(latents.poses.dims(), [3, 16, 4]);
        assert_eq!(latents.context.dims(), [3, 16, 32]);
        assert_eq!(latents.window.dims(), [3, 16, 1]);
    }

    #[test]
    fn test_initial_positions_on_grid() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(2, 4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let positions: Vec<f32> = autodecoder.raw_all().positions.to_data().to_vec().unwrap();
        let expected = [-0.5, -0.5, 0.5, -0.5, -0.5, 0.5, 0.5, 0.5];

        // Both signals share the same initial grid.
        assert_eq!(&positions[..8], &expected);
        assert_eq!(&positions[8..], &expected);
    }

    #[test]
    fn test_initial_window_and_features() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(1, 9, 4)
            .with_gaussian_window_size(0.25)
            .init::<TestBackend>(&device)
            .unwrap();

        let raw = autodecoder.raw_all();
        let window: Vec<f32> = raw.window.to_data().to_vec().unwrap();
        assert!(window.iter().all(|&w| (w - 0.25).abs() < 1e-6));

        let features: Vec<f32> = raw.features.to_data().to_vec().unwrap();
        assert!(features.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn test_unoriented_latents() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(3, 4, 8)
            .with_num_ori_dims(0)
            .with_num_pos_dims(3)
            .init::<TestBackend>(&device)
            .unwrap();

        let indices = Tensor::<TestBackend, 1, Int>::from_data([1], &device);
        let latents = autodecoder.forward(indices).unwrap();
        assert_eq!(latents.poses.dims(), [1, 4, 3]);
    }

    #[test]
    fn test_rejects_non_square_latents() {
        let device = Default::default();
        let result = AutodecoderConfig::new(1, 10, 8).init::<TestBackend>(&device);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_raw_replaces_latents() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(2, 4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let replacement = autodecoder.raw_all().map(|t| t.zeros_like());
        let loaded = autodecoder.load_raw(replacement).unwrap();
        let features: Vec<f32> = loaded.raw_all().features.to_data().to_vec().unwrap();
        assert!(features.iter().all(|&f| f == 0.0));

        let wrong = AutodecoderConfig::new(3, 4, 8)
            .init::<TestBackend>(&device)
            .unwrap()
            .raw_all();
        assert!(loaded.load_raw(wrong).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(2, 4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let indices = Tensor::<TestBackend, 1, Int>::from_data([0, 2], &device);
        let err = autodecoder.forward(indices).unwrap_err();
        assert!(matches!(
            err,
            NeuralEnfError::SignalIndexOutOfBounds { index: 2, num_signals: 2 }
        ));
    }

    #[test]
    fn test_negative_index_reported_as_given() {
        let device = Default::default();
        let autodecoder = AutodecoderConfig::new(2, 4, 8)
            .init::<TestBackend>(&device)
            .unwrap();

        let indices = Tensor::<TestBackend, 1, Int>::from_data([-1, 0], &device);
        let err = autodecoder.forward(indices).unwrap_err();
        assert!(matches!(
            err,
            NeuralEnfError::SignalIndexOutOfBounds { index: -1, num_signals: 2 }
        ));
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn test_non_square_latents_is_config_error() {
        let config = AutodecoderConfig::new(2, 5, 8);
        assert!(matches!(
            config.validate(),
            Err(NeuralEnfError::InvalidConfig { .. })
        ));
    }
}
