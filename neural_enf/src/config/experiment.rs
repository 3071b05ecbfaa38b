//! Experiment-level configuration: data sizes, fitting and meta-learning.

use std::path::Path;

use burn::config::Config;

use super::NefConfig;
use crate::error::{self, NeuralEnfError};

/// Dataset sizes the autodecoders are allocated for.
#[derive(Config, Debug)]
pub struct DatasetConfig {
    /// Signals in the training split (one latent set each).
    pub num_signals_train: usize,

    /// Signals in the test split.
    pub num_signals_test: usize,

    /// Signals per optimization step.
    #[config(default = 32)]
    pub batch_size: usize,
}

/// First-order meta-learning of the latent initialization.
#[derive(Config, Debug)]
pub struct MetaConfig {
    /// Step size of the inner-loop latent updates.
    #[config(default = 1.0)]
    pub inner_learning_rate: f64,

    /// Inner-loop gradient steps per outer step.
    #[config(default = 3)]
    pub num_inner_steps: usize,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimizer settings for fitting.
#[derive(Config, Debug)]
pub struct FitConfig {
    /// Learning rate of the field parameters.
    #[config(default = 5e-4)]
    pub learning_rate_enf: f64,

    /// Learning rate of the latents (autodecoding and the meta outer latents).
    #[config(default = 1e-3)]
    pub learning_rate_latents: f64,

    /// Passes over the training signals.
    #[config(default = 10)]
    pub num_epochs: usize,

    /// Steps between log lines.
    #[config(default = 10)]
    pub log_interval: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Full experiment configuration.
///
/// Meta-learning is selected by the presence of `meta`.
#[derive(Config, Debug)]
pub struct ExperimentConfig {
    /// Field configuration.
    pub nef: NefConfig,

    /// Dataset sizes.
    pub dataset: DatasetConfig,

    /// Optimizer settings.
    #[config(default = "FitConfig::new()")]
    pub fit: FitConfig,

    /// Meta-learning settings.
    #[config(default = "None")]
    pub meta: Option<MetaConfig>,
}

impl ExperimentConfig {
    /// Whether this experiment meta-learns the latent initialization.
    pub fn is_meta(&self) -> bool {
        self.meta.is_some()
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> error::Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path)
            .map_err(|e| NeuralEnfError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        log::debug!("Loaded experiment configuration from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> error::Result<()> {
        self.nef.validate()?;

        if self.dataset.batch_size == 0 {
            return Err(NeuralEnfError::invalid_config("batch_size must be positive"));
        }
        if self.fit.learning_rate_enf <= 0.0 || self.fit.learning_rate_latents <= 0.0 {
            return Err(NeuralEnfError::invalid_config(
                "learning rates must be positive",
            ));
        }
        if let Some(meta) = &self.meta {
            if meta.inner_learning_rate <= 0.0 {
                return Err(NeuralEnfError::invalid_config(
                    "inner_learning_rate must be positive",
                ));
            }
        } else if self.dataset.num_signals_train == 0 || self.dataset.num_signals_test == 0 {
            return Err(NeuralEnfError::invalid_config(
                "autodecoding needs at least one train and one test signal",
            ));
        }

        Ok(())
    }
}
