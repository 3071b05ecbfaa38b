//! Invariant-conditioned multi-head attention.
//!
//! Both attention stages of the field share one pattern: queries, keys and
//! values are laid out as `[batch, n, m, heads · head_dim]`, where every one of
//! the `n` queries has its own set of `m` keys, and the pose information enters
//! only through embedded invariants.

use burn::module::Module;
use burn::nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use super::embedding::{EmbeddingKind, InvariantEmbedding, InvariantEmbeddingConfig};
use super::mlp::{Mlp, MlpConfig};

/// Scaled dot-product attention over the third dimension.
///
/// - `q`, `k`: broadcastable to `[batch, n, m, heads · head_dim]`
/// - `v`: exactly `[batch, n, m, heads · head_dim]`
/// - `bias`: added to the logits, broadcastable to `[batch, n, m, heads]`
///
/// Returns `[batch, n, heads · head_dim]`.
pub(crate) fn attend<B: Backend>(
    q: Tensor<B, 4>,
    k: Tensor<B, 4>,
    v: Tensor<B, 4>,
    bias: Option<Tensor<B, 4>>,
    num_heads: usize,
) -> Tensor<B, 3> {
    let [b, n, m, width] = v.dims();
    let head_dim = width / num_heads;

    let mut logits = (q * k)
        .reshape([b, n, m, num_heads, head_dim])
        .sum_dim(4)
        .reshape([b, n, m, num_heads])
        .div_scalar((head_dim as f32).sqrt());
    if let Some(bias) = bias {
        logits = logits + bias;
    }

    let weights = softmax(logits, 2).unsqueeze_dim::<5>(4);
    let values = v.reshape([b, n, m, num_heads, head_dim]);

    (weights * values).sum_dim(2).reshape([b, n, width])
}

/// Condition values on embedded invariants.
///
/// With `transform`, `cond` holds a scale and a shift (`v·(1+γ) + β`);
/// otherwise it is added to the values.
pub(crate) fn condition_values<B: Backend>(
    values: Tensor<B, 4>,
    cond: Tensor<B, 4>,
    transform: bool,
) -> Tensor<B, 4> {
    if transform {
        let width = cond.dims()[3] / 2;
        let gamma = cond.clone().narrow(3, 0, width);
        let beta = cond.narrow(3, width, width);
        values * gamma.add_scalar(1.0) + beta
    } else {
        values + cond
    }
}

/// Settings shared by the attention stages.
#[derive(Debug, Clone, Copy)]
pub struct AttentionSettings {
    /// Hidden width and per-head dimension.
    pub num_hidden: usize,
    /// Number of heads.
    pub num_heads: usize,
    /// Invariant embedding kind.
    pub embedding_type: EmbeddingKind,
    /// Frequency multiplier of the invariant embedding.
    pub freq_multiplier: f32,
    /// Scale-and-shift value conditioning.
    pub condition_value_transform: bool,
}

impl AttentionSettings {
    /// Total width of all heads.
    pub fn heads_width(&self) -> usize {
        self.num_hidden * self.num_heads
    }

    /// Output width of a value-conditioning projection.
    pub fn condition_width(&self) -> usize {
        if self.condition_value_transform {
            2 * self.heads_width()
        } else {
            self.heads_width()
        }
    }
}

/// Latent self-attention layer.
///
/// Latent `i` attends to every latent `j`; keys and values are conditioned on
/// the embedded invariant `a(p_i, p_j)`, followed by a feed-forward block.
/// Both sub-layers are pre-normalized and residual.
#[derive(Module, Debug)]
pub struct SelfAttentionBlock<B: Backend> {
    norm_attention: LayerNorm<B>,
    query: Linear<B>,
    key: Linear<B>,
    value: Linear<B>,
    invariant_embedding: InvariantEmbedding<B>,
    key_condition: Linear<B>,
    value_condition: Linear<B>,
    output: Linear<B>,
    norm_feed_forward: LayerNorm<B>,
    feed_forward: Mlp<B>,
    #[module(skip)]
    num_heads: usize,
    #[module(skip)]
    condition_value_transform: bool,
}

impl<B: Backend> SelfAttentionBlock<B> {
    /// Create a block for invariants of width `invariant_dim`.
    pub fn new(settings: &AttentionSettings, invariant_dim: usize, device: &B::Device) -> Self {
        let hidden = settings.num_hidden;
        let heads = settings.heads_width();

        Self {
            norm_attention: LayerNormConfig::new(hidden).init(device),
            query: LinearConfig::new(hidden, heads).init(device),
            key: LinearConfig::new(hidden, heads).init(device),
            value: LinearConfig::new(hidden, heads).init(device),
            invariant_embedding: InvariantEmbeddingConfig::new(invariant_dim, hidden)
                .with_freq_multiplier(settings.freq_multiplier)
                .init(settings.embedding_type, device),
            key_condition: LinearConfig::new(hidden, heads).init(device),
            value_condition: LinearConfig::new(hidden, settings.condition_width()).init(device),
            output: LinearConfig::new(heads, hidden).init(device),
            norm_feed_forward: LayerNormConfig::new(hidden).init(device),
            feed_forward: MlpConfig::new(hidden, hidden)
                .with_hidden_dims(vec![hidden])
                .init(device),
            num_heads: settings.num_heads,
            condition_value_transform: settings.condition_value_transform,
        }
    }

    /// Forward pass.
    ///
    /// - `hidden`: `[batch, num_latents, num_hidden]`
    /// - `invariants`: `[batch, num_latents, num_latents, dim]`
    pub fn forward(&self, hidden: Tensor<B, 3>, invariants: Tensor<B, 4>) -> Tensor<B, 3> {
        let x = self.norm_attention.forward(hidden.clone());
        let embedded = self.invariant_embedding.forward(invariants);

        let q = self.query.forward(x.clone()).unsqueeze_dim::<4>(2);
        let k = self.key.forward(x.clone()).unsqueeze_dim::<4>(1)
            + self.key_condition.forward(embedded.clone());
        let v = condition_values(
            self.value.forward(x).unsqueeze_dim::<4>(1),
            self.value_condition.forward(embedded),
            self.condition_value_transform,
        );

        let attended = attend(q, k, v, None, self.num_heads);
        let hidden = hidden + self.output.forward(attended);

        let ff = self
            .feed_forward
            .forward(self.norm_feed_forward.forward(hidden.clone()));
        hidden + ff
    }
}
