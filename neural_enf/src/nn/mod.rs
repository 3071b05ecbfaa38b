//! Neural network modules of the equivariant neural field.
//!
//! This module provides:
//! - Invariant embeddings (random Fourier features or a plain MLP)
//! - Invariant-conditioned self-attention over latents
//! - The cross-attention field [`EquivariantCrossAttentionEnf`]
//! - MLP building blocks

pub mod attention;
pub mod embedding;
pub mod enf;
pub mod mlp;

pub use attention::{AttentionSettings, SelfAttentionBlock};
pub use embedding::{EmbeddingKind, InvariantEmbedding, InvariantEmbeddingConfig};
pub use enf::{EquivariantCrossAttentionEnf, EquivariantCrossAttentionEnfConfig};
pub use mlp::{Mlp, MlpConfig};
