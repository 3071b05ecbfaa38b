//! Neural field configuration.

use burn::config::Config;

use enf_core::{latent_grid_side, InvariantType};

use crate::error::{self, NeuralEnfError};
use crate::nn::EmbeddingKind;

/// Configuration for the equivariant cross-attention neural field and its latents.
///
/// Every field read by [`get_model`](crate::factory::get_model) lives here.
#[derive(Config, Debug)]
pub struct NefConfig {
    /// Number of output channels (e.g. 1 for grayscale, 3 for RGB).
    pub num_out: usize,

    /// Positional dimensions of the input coordinates.
    #[config(default = 2)]
    pub num_in: usize,

    /// Hidden width of every head and MLP.
    #[config(default = 128)]
    pub num_hidden: usize,

    /// Number of attention heads.
    #[config(default = 3)]
    pub num_heads: usize,

    /// Number of latent self-attention layers before the cross-attention.
    #[config(default = 2)]
    pub num_self_att_layers: usize,

    /// Width of the context vector attached to each latent.
    #[config(default = 32)]
    pub latent_dim: usize,

    /// Latents per signal. Must be a perfect square.
    #[config(default = 25)]
    pub num_latents: usize,

    /// Initial Gaussian window size of every latent.
    #[config(default = 0.1)]
    pub gaussian_window: f32,

    /// Invariant family: `ponita`, `rel_pos`, `abs_pos` or `norm_rel_pos`.
    #[config(default = "String::from(\"ponita\")")]
    pub invariant_type: String,

    /// Invariant embedding: `rff` or `ffn`.
    #[config(default = "String::from(\"rff\")")]
    pub embedding_type: String,

    /// Frequency multiplier of the query (invariant) embedding.
    #[config(default = 0.2)]
    pub embedding_freq_multiplier_invariant: f32,

    /// Frequency multiplier of the value-conditioning embedding.
    #[config(default = 3.0)]
    pub embedding_freq_multiplier_value: f32,

    /// Modulate values with a learned scale and shift instead of an additive bias.
    #[config(default = true)]
    pub condition_value_transform: bool,

    /// Latents each coordinate attends to (0 = all).
    #[config(default = 4)]
    pub top_k: usize,
}

impl NefConfig {
    /// Parse the invariant family.
    pub fn invariant(&self) -> error::Result<InvariantType> {
        self.invariant_type
            .parse()
            .map_err(|_| NeuralEnfError::invalid_config(format!(
                "unknown invariant_type '{}'",
                self.invariant_type
            )))
    }

    /// Parse the embedding kind.
    pub fn embedding(&self) -> error::Result<EmbeddingKind> {
        self.embedding_type.parse()
    }

    /// Number of latents each coordinate attends to after clamping.
    pub fn effective_top_k(&self) -> usize {
        if self.top_k == 0 {
            self.num_latents
        } else {
            self.top_k.min(self.num_latents)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> error::Result<()> {
        if self.num_out == 0 {
            return Err(NeuralEnfError::invalid_config("num_out must be positive"));
        }
        if self.num_hidden == 0 || self.num_heads == 0 {
            return Err(NeuralEnfError::invalid_config(
                "num_hidden and num_heads must be positive",
            ));
        }
        if self.latent_dim == 0 {
            return Err(NeuralEnfError::invalid_config("latent_dim must be positive"));
        }
        if self.embedding()? == EmbeddingKind::Rff && self.num_hidden % 2 != 0 {
            return Err(NeuralEnfError::invalid_config(
                "num_hidden must be even for rff embeddings",
            ));
        }
        if self.gaussian_window <= 0.0 {
            return Err(NeuralEnfError::invalid_config("gaussian_window must be positive"));
        }
        latent_grid_side(self.num_latents)
            .map_err(|e| NeuralEnfError::invalid_config(e.to_string()))?;
        let invariant = self.invariant()?;
        if invariant == InvariantType::Ponita && self.num_in != 2 {
            return Err(NeuralEnfError::invalid_config(
                "ponita invariants are defined for 2D coordinates only",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NefConfig::new(3);
        assert_eq!(config.num_out, 3);
        assert_eq!(config.num_latents, 25);
        assert_eq!(config.invariant_type, "ponita");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_top_k_clamped() {
        let config = NefConfig::new(1).with_num_latents(4).with_top_k(9);
        assert_eq!(config.effective_top_k(), 4);

        let all = NefConfig::new(1).with_top_k(0);
        assert_eq!(all.effective_top_k(), 25);
    }

    #[test]
    fn test_validation() {
        let valid = NefConfig::new(1);

        let non_square = valid.clone().with_num_latents(10);
        assert!(matches!(
            non_square.validate(),
            Err(NeuralEnfError::InvalidConfig { .. })
        ));

        let unknown = valid.clone().with_invariant_type("spherical".into());
        assert!(matches!(
            unknown.validate(),
            Err(NeuralEnfError::InvalidConfig { .. })
        ));

        let unknown_embedding = valid.clone().with_embedding_type("siren".into());
        assert!(unknown_embedding.validate().is_err());

        let odd_rff = valid.clone().with_num_hidden(7);
        assert!(odd_rff.validate().is_err());
        assert!(odd_rff.with_embedding_type("ffn".into()).validate().is_ok());

        let ponita_3d = valid.clone().with_num_in(3);
        assert!(ponita_3d.validate().is_err());

        let rel_pos_3d = valid.with_num_in(3).with_invariant_type("rel_pos".into());
        assert!(rel_pos_3d.validate().is_ok());
    }
}
