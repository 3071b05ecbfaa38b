//! Embeddings of invariant features.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::tensor::Distribution;

use super::mlp::{Mlp, MlpConfig};
use crate::error::NeuralEnfError;

/// How invariant features are lifted to the hidden width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingKind {
    /// Random Fourier features followed by an MLP.
    #[default]
    Rff,
    /// A plain MLP on the raw invariant.
    Ffn,
}

impl FromStr for EmbeddingKind {
    type Err = NeuralEnfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rff" => Ok(EmbeddingKind::Rff),
            "ffn" => Ok(EmbeddingKind::Ffn),
            other => Err(NeuralEnfError::invalid_config(format!(
                "unknown embedding_type '{}' (expected rff or ffn)",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingKind::Rff => f.write_str("rff"),
            EmbeddingKind::Ffn => f.write_str("ffn"),
        }
    }
}

/// Configuration for an invariant embedding.
#[derive(Config, Debug)]
pub struct InvariantEmbeddingConfig {
    /// Invariant feature dimension.
    pub input_dim: usize,
    /// Output dimension. Must be even for RFF.
    pub output_dim: usize,
    /// Standard deviation of the random frequencies.
    #[config(default = 1.0)]
    pub freq_multiplier: f32,
}

impl InvariantEmbeddingConfig {
    /// Initialize the embedding.
    pub fn init<B: Backend>(&self, kind: EmbeddingKind, device: &B::Device) -> InvariantEmbedding<B> {
        match kind {
            EmbeddingKind::Rff => {
                let num_frequencies = self.output_dim / 2;
                let frequencies = Tensor::random(
                    [self.input_dim, num_frequencies],
                    Distribution::Normal(0.0, self.freq_multiplier as f64),
                    device,
                );
                let projection = MlpConfig::new(2 * num_frequencies, self.output_dim)
                    .with_hidden_dims(vec![self.output_dim])
                    .init(device);
                InvariantEmbedding {
                    frequencies: Some(frequencies),
                    projection,
                }
            }
            EmbeddingKind::Ffn => InvariantEmbedding {
                frequencies: None,
                projection: MlpConfig::new(self.input_dim, self.output_dim)
                    .with_hidden_dims(vec![self.output_dim])
                    .init(device),
            },
        }
    }
}

/// Lifts invariant features `[batch, n, m, dim]` to `[batch, n, m, output_dim]`.
///
/// The random frequencies are a constant of the module and are never trained.
#[derive(Module, Debug)]
pub struct InvariantEmbedding<B: Backend> {
    /// Random Fourier frequencies: [input_dim, output_dim / 2]
    frequencies: Option<Tensor<B, 2>>,
    /// Projection to the output dimension.
    projection: Mlp<B>,
}

impl<B: Backend> InvariantEmbedding<B> {
    /// Embed a batch of invariants.
    pub fn forward(&self, invariants: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.frequencies {
            Some(frequencies) => {
                let [b, n, m, d] = invariants.dims();
                let num_frequencies = frequencies.dims()[1];

                let scaled = invariants
                    .reshape([b * n * m, d])
                    .matmul(frequencies.clone())
                    .mul_scalar(TAU);
                let features = Tensor::cat(vec![scaled.clone().cos(), scaled.sin()], 1)
                    .reshape([b, n, m, 2 * num_frequencies]);

                self.projection.forward(features)
            }
            None => self.projection.forward(invariants),
        }
    }
}
