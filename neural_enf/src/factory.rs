//! Building a field and its latent storage from an experiment configuration.

use burn::prelude::*;

use crate::config::{ExperimentConfig, NefConfig};
use crate::error::Result;
use crate::invariant::{get_ca_invariant, get_sa_invariant};
use crate::latents::{
    AutodecoderConfig, PositionOrientationFeatureAutodecoder,
    PositionOrientationFeatureAutodecoderMeta,
};
use crate::nn::{EquivariantCrossAttentionEnf, EquivariantCrossAttentionEnfConfig};

/// A field together with the autodecoders that condition it.
#[derive(Debug)]
pub enum ModelBundle<B: Backend> {
    /// Autodecoding: one latent set per train and per test signal.
    Standard {
        /// The neural field.
        enf: EquivariantCrossAttentionEnf<B>,
        /// Latents of the training signals.
        train: PositionOrientationFeatureAutodecoder<B>,
        /// Latents of the test signals.
        val: PositionOrientationFeatureAutodecoder<B>,
    },
    /// Meta-learning: a learned initialization adapted per batch.
    Meta {
        /// The neural field.
        enf: EquivariantCrossAttentionEnf<B>,
        /// Per-batch latents, one set per signal in a batch.
        inner: PositionOrientationFeatureAutodecoderMeta<B>,
        /// The shared initialization, a single latent set.
        outer: PositionOrientationFeatureAutodecoderMeta<B>,
    },
}

impl<B: Backend> ModelBundle<B> {
    /// The neural field.
    pub fn enf(&self) -> &EquivariantCrossAttentionEnf<B> {
        match self {
            ModelBundle::Standard { enf, .. } | ModelBundle::Meta { enf, .. } => enf,
        }
    }

    /// Whether this bundle was built for meta-learning.
    pub fn is_meta(&self) -> bool {
        matches!(self, ModelBundle::Meta { .. })
    }
}

/// Resolve a field configuration into the model configuration.
pub fn enf_config(nef: &NefConfig) -> Result<EquivariantCrossAttentionEnfConfig> {
    Ok(EquivariantCrossAttentionEnfConfig {
        num_hidden: nef.num_hidden,
        num_heads: nef.num_heads,
        num_self_att_layers: nef.num_self_att_layers,
        num_out: nef.num_out,
        latent_dim: nef.latent_dim,
        self_attn_invariant: get_sa_invariant(nef)?,
        cross_attn_invariant: get_ca_invariant(nef)?,
        embedding_type: nef.embedding()?,
        embedding_freq_multiplier: [
            nef.embedding_freq_multiplier_invariant,
            nef.embedding_freq_multiplier_value,
        ],
        condition_value_transform: nef.condition_value_transform,
        top_k_latent_sampling: nef.effective_top_k(),
    })
}

/// Autodecoder settings matching the latent poses of the cross-attention invariant.
fn autodecoder_config(nef: &NefConfig, num_signals: usize) -> Result<AutodecoderConfig> {
    let dims = get_ca_invariant(nef)?.dims();
    Ok(AutodecoderConfig::new(num_signals, nef.num_latents, nef.latent_dim)
        .with_num_pos_dims(dims.num_z_pos_dims)
        .with_num_ori_dims(dims.num_z_ori_dims)
        .with_gaussian_window_size(nef.gaussian_window))
}

/// Build the field and its autodecoders.
///
/// Without a meta-learning section this allocates train and test latents;
/// with one, an inner autodecoder of `batch_size` sets and an outer one holding
/// the single shared initialization.
pub fn get_model<B: Backend>(config: &ExperimentConfig, device: &B::Device) -> Result<ModelBundle<B>> {
    config.validate()?;
    let nef = &config.nef;

    let enf = enf_config(nef)?.init(device)?;

    let bundle = match &config.meta {
        None => {
            let train = autodecoder_config(nef, config.dataset.num_signals_train)?.init(device)?;
            let val = autodecoder_config(nef, config.dataset.num_signals_test)?.init(device)?;
            log::info!(
                "Built autodecoding model: {} train / {} test signals, {} latents each",
                train.num_signals(),
                val.num_signals(),
                nef.num_latents
            );
            ModelBundle::Standard { enf, train, val }
        }
        Some(meta) => {
            let inner = autodecoder_config(nef, config.dataset.batch_size)?.init_meta(device)?;
            let outer = autodecoder_config(nef, 1)?.init_meta(device)?;
            log::info!(
                "Built meta-learning model: batch {} with {} inner steps, {} latents each",
                inner.num_signals(),
                meta.num_inner_steps,
                nef.num_latents
            );
            ModelBundle::Meta { enf, inner, outer }
        }
    };

    Ok(bundle)
}
