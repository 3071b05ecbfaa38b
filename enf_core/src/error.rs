//! Error types for enf_core operations.
//!
//! Provides a simple error enum with no external dependencies for no_std compatibility.

use core::fmt;

/// Error types that can occur during enf_core operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnfCoreError {
    /// The invariant name is not one of the known kinds.
    UnknownInvariant,
    /// A coordinate had the wrong number of components.
    DimensionMismatch {
        /// The number of components required.
        expected: usize,
        /// The number of components provided.
        got: usize,
    },
    /// Latents are initialized on a square grid, so their count must be a perfect square.
    NonSquareLatentCount {
        /// The requested number of latents.
        num_latents: usize,
    },
}

impl fmt::Display for EnfCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnfCoreError::UnknownInvariant => {
                write!(
                    f,
                    "unknown invariant (expected one of: ponita, rel_pos, abs_pos, norm_rel_pos)"
                )
            }
            EnfCoreError::DimensionMismatch { expected, got } => {
                write!(f, "expected {} coordinate components, got {}", expected, got)
            }
            EnfCoreError::NonSquareLatentCount { num_latents } => {
                write!(f, "num_latents {} is not a perfect square", num_latents)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EnfCoreError {}
