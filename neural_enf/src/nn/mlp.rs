//! MLP (Multi-Layer Perceptron) building blocks.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Gelu, Linear, LinearConfig};
use burn::prelude::*;

/// Configuration for an MLP.
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Input dimension.
    pub input_dim: usize,
    /// Output dimension.
    pub output_dim: usize,
    /// Hidden layer dimensions.
    #[config(default = "vec![]")]
    pub hidden_dims: Vec<usize>,
}

impl MlpConfig {
    /// Initialize the MLP.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut layers = Vec::new();
        let mut in_dim = self.input_dim;

        for &out_dim in &self.hidden_dims {
            layers.push(LinearConfig::new(in_dim, out_dim).init(device));
            in_dim = out_dim;
        }

        let output = LinearConfig::new(in_dim, self.output_dim).init(device);

        Mlp {
            layers,
            output,
            activation: Gelu::new(),
        }
    }
}

/// Multi-Layer Perceptron module.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    /// Hidden layers.
    layers: Vec<Linear<B>>,
    /// Output layer.
    output: Linear<B>,
    /// Activation function.
    activation: Gelu,
}

impl<B: Backend> Mlp<B> {
    /// Forward pass over the last dimension of a tensor of any rank.
    ///
    /// Input shape: [.., input_dim]
    /// Output shape: [.., output_dim]
    pub fn forward<const D: usize>(&self, mut x: Tensor<B, D>) -> Tensor<B, D> {
        for layer in &self.layers {
            x = layer.forward(x);
            x = self.activation.forward(x);
        }

        self.output.forward(x)
    }

    /// Output dimension.
    pub fn output_dim(&self) -> usize {
        self.output.weight.val().dims()[1]
    }
}
