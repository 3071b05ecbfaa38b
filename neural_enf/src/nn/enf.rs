//! Equivariant cross-attention neural field.

use burn::module::{Ignored, Module};
use burn::nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::prelude::*;

use enf_core::InvariantKind;

use super::attention::{attend, condition_values, AttentionSettings, SelfAttentionBlock};
use super::embedding::{EmbeddingKind, InvariantEmbedding, InvariantEmbeddingConfig};
use super::mlp::{Mlp, MlpConfig};
use crate::error::{NeuralEnfError, Result};
use crate::invariant::{pairwise_sq_distance, Invariant};
use crate::latents::Latents;

/// Configuration for [`EquivariantCrossAttentionEnf`].
///
/// Holds resolved invariants and embedding kinds rather than their names;
/// [`get_model`](crate::factory::get_model) builds it from a [`NefConfig`](crate::config::NefConfig).
#[derive(Debug, Clone)]
pub struct EquivariantCrossAttentionEnfConfig {
    /// Hidden width, also the dimension of every head.
    pub num_hidden: usize,
    /// Number of attention heads.
    pub num_heads: usize,
    /// Latent self-attention layers.
    pub num_self_att_layers: usize,
    /// Output channels.
    pub num_out: usize,
    /// Width of the latent context vectors.
    pub latent_dim: usize,
    /// Invariant between pairs of latents.
    pub self_attn_invariant: InvariantKind,
    /// Invariant between input coordinates and latents.
    pub cross_attn_invariant: InvariantKind,
    /// How invariants are embedded.
    pub embedding_type: EmbeddingKind,
    /// Frequency multipliers: `[query/invariant, value]`.
    pub embedding_freq_multiplier: [f32; 2],
    /// Scale-and-shift value conditioning instead of an additive bias.
    pub condition_value_transform: bool,
    /// Latents attended per coordinate; 0 attends to all.
    pub top_k_latent_sampling: usize,
}

impl EquivariantCrossAttentionEnfConfig {
    /// Check widths and invariant compatibility.
    pub fn validate(&self) -> Result<()> {
        if self.num_hidden == 0 || self.num_heads == 0 || self.num_out == 0 || self.latent_dim == 0
        {
            return Err(NeuralEnfError::invalid_config(
                "num_hidden, num_heads, num_out and latent_dim must be positive",
            ));
        }
        if self.embedding_type == EmbeddingKind::Rff && self.num_hidden % 2 != 0 {
            return Err(NeuralEnfError::invalid_config(
                "num_hidden must be even for rff embeddings",
            ));
        }

        let sa = self.self_attn_invariant.dims();
        let ca = self.cross_attn_invariant.dims();
        if sa.x_embedding_dim() != ca.z_embedding_dim() || sa.z_embedding_dim() != ca.z_embedding_dim()
        {
            return Err(NeuralEnfError::invalid_config(format!(
                "self-attention invariant {:?} does not act on the latent poses of {:?}",
                self.self_attn_invariant, self.cross_attn_invariant
            )));
        }
        Ok(())
    }

    fn settings(&self, freq_multiplier: f32) -> AttentionSettings {
        AttentionSettings {
            num_hidden: self.num_hidden,
            num_heads: self.num_heads,
            embedding_type: self.embedding_type,
            freq_multiplier,
            condition_value_transform: self.condition_value_transform,
        }
    }

    /// Initialize the field.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<EquivariantCrossAttentionEnf<B>> {
        self.validate()?;

        let [freq_invariant, freq_value] = self.embedding_freq_multiplier;
        let settings = self.settings(freq_invariant);
        let hidden = self.num_hidden;
        let heads = settings.heads_width();

        let sa_dim = self.self_attn_invariant.dims().dim;
        let self_attention = (0..self.num_self_att_layers)
            .map(|_| SelfAttentionBlock::new(&settings, sa_dim, device))
            .collect();

        let ca_dim = self.cross_attn_invariant.dims().dim;
        let embedding = |freq: f32| {
            InvariantEmbeddingConfig::new(ca_dim, hidden)
                .with_freq_multiplier(freq)
                .init(self.embedding_type, device)
        };

        log::debug!(
            "ENF: hidden={} heads={} self-attention layers={} invariants=({:?}, {:?}) top_k={}",
            hidden,
            self.num_heads,
            self.num_self_att_layers,
            self.self_attn_invariant,
            self.cross_attn_invariant,
            self.top_k_latent_sampling
        );

        Ok(EquivariantCrossAttentionEnf {
            latent_stem: LinearConfig::new(self.latent_dim, hidden).init(device),
            self_attention,
            context_norm: LayerNormConfig::new(hidden).init(device),
            query_embedding: embedding(freq_invariant),
            value_embedding: embedding(freq_value),
            query: LinearConfig::new(hidden, heads).init(device),
            key: LinearConfig::new(hidden, heads).init(device),
            value: LinearConfig::new(hidden, heads).init(device),
            value_condition: LinearConfig::new(hidden, settings.condition_width()).init(device),
            output: LinearConfig::new(heads, hidden).init(device),
            decoder: MlpConfig::new(hidden, self.num_out)
                .with_hidden_dims(vec![hidden])
                .init(device),
            self_attn_invariant: Ignored(self.self_attn_invariant),
            cross_attn_invariant: Ignored(self.cross_attn_invariant),
            num_heads: self.num_heads,
            top_k: self.top_k_latent_sampling,
            condition_value_transform: self.condition_value_transform,
        })
    }
}

/// Neural field conditioned on a latent point cloud through invariant cross-attention.
///
/// Coordinates only see latents through invariants of `(x, p)`, so a joint
/// group action on coordinates and latent poses leaves the output unchanged
/// whenever the cross-attention invariant is group invariant.
#[derive(Module, Debug)]
pub struct EquivariantCrossAttentionEnf<B: Backend> {
    latent_stem: Linear<B>,
    self_attention: Vec<SelfAttentionBlock<B>>,
    context_norm: LayerNorm<B>,
    query_embedding: InvariantEmbedding<B>,
    value_embedding: InvariantEmbedding<B>,
    query: Linear<B>,
    key: Linear<B>,
    value: Linear<B>,
    value_condition: Linear<B>,
    output: Linear<B>,
    decoder: Mlp<B>,
    self_attn_invariant: Ignored<InvariantKind>,
    cross_attn_invariant: Ignored<InvariantKind>,
    #[module(skip)]
    num_heads: usize,
    #[module(skip)]
    top_k: usize,
    #[module(skip)]
    condition_value_transform: bool,
}

impl<B: Backend> EquivariantCrossAttentionEnf<B> {
    /// Output channels.
    pub fn num_out(&self) -> usize {
        self.decoder.output_dim()
    }

    /// Invariant used between coordinates and latents.
    pub fn cross_attn_invariant(&self) -> InvariantKind {
        *self.cross_attn_invariant
    }

    /// Invariant used between latents.
    pub fn self_attn_invariant(&self) -> InvariantKind {
        *self.self_attn_invariant
    }

    /// Latent context after the self-attention stack: `[batch, num_latents, num_hidden]`.
    pub fn encode_latents(&self, latents: &Latents<B>) -> Result<Tensor<B, 3>> {
        let latent_dim = self.latent_stem.weight.val().dims()[0];
        let context = latents.context.dims();
        if context[2] != latent_dim {
            return Err(NeuralEnfError::ShapeMismatch {
                context: "latent context",
                expected: vec![context[0], context[1], latent_dim],
                got: context.to_vec(),
            });
        }

        let mut hidden = self.latent_stem.forward(latents.context.clone());

        if !self.self_attention.is_empty() {
            let invariants = self
                .self_attn_invariant
                .0
                .compute(latents.poses.clone(), latents.poses.clone())?;
            for block in &self.self_attention {
                hidden = block.forward(hidden, invariants.clone());
            }
        }

        Ok(self.context_norm.forward(hidden))
    }

    /// Evaluate the field.
    ///
    /// - `x`: coordinates `[batch, num_coords, num_in]`
    /// - `latents`: one latent set per batch entry
    ///
    /// Returns `[batch, num_coords, num_out]`.
    pub fn forward(&self, x: Tensor<B, 3>, latents: &Latents<B>) -> Result<Tensor<B, 3>> {
        latents.validate()?;

        let context = self.encode_latents(latents)?;
        let cross_attn_invariant = self.cross_attn_invariant();
        let invariants = cross_attn_invariant.compute(x.clone(), latents.poses.clone())?;
        let num_pos_dims = cross_attn_invariant.dims().num_z_pos_dims;
        let distances = pairwise_sq_distance(x, latents.poses.clone(), num_pos_dims);

        let [batch, num_coords, num_latents, _] = invariants.dims();
        let num_attended = if self.top_k == 0 {
            num_latents
        } else {
            self.top_k.min(num_latents)
        };

        // Per-coordinate tensors over latents: [batch, num_coords | 1, num_attended, _]
        let (invariants, distances, context, window) = if num_attended < num_latents {
            let (_, nearest) = distances
                .clone()
                .reshape([batch, num_coords, num_latents])
                .neg()
                .topk_with_indices(num_attended, 2);
            let nearest = nearest.unsqueeze_dim::<4>(3);
            let gather = |t: Tensor<B, 4>| {
                let width = t.dims()[3];
                let t = if t.dims()[1] == num_coords {
                    t
                } else {
                    t.repeat_dim(1, num_coords)
                };
                t.gather(2, nearest.clone().repeat_dim(3, width))
            };

            (
                gather(invariants),
                gather(distances),
                gather(context.unsqueeze_dim::<4>(1)),
                gather(latents.window.clone().unsqueeze_dim::<4>(1)),
            )
        } else {
            (
                invariants,
                distances,
                context.unsqueeze_dim::<4>(1),
                latents.window.clone().unsqueeze_dim::<4>(1),
            )
        };

        let q = self.query.forward(self.query_embedding.forward(invariants.clone()));
        let k = self.key.forward(context.clone());
        let v = condition_values(
            self.value.forward(context),
            self.value_condition
                .forward(self.value_embedding.forward(invariants)),
            self.condition_value_transform,
        );
        let window_bias = distances.neg() / window;

        let attended = attend(q, k, v, Some(window_bias), self.num_heads);
        Ok(self.decoder.forward(self.output.forward(attended)))
    }
}
