//! Error types for neural_enf.

use enf_core::EnfCoreError;
use thiserror::Error;

/// Errors that can occur while building or running an equivariant neural field.
#[derive(Error, Debug)]
pub enum NeuralEnfError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Which input was malformed.
        context: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Signal index outside the autodecoder's storage.
    #[error("signal index {index} out of bounds for {num_signals} signals")]
    SignalIndexOutOfBounds {
        /// The requested signal index, possibly negative.
        index: i64,
        /// Number of signals held by the autodecoder.
        num_signals: usize,
    },

    /// Training error.
    #[error("training error: {message}")]
    TrainingError {
        /// Description of the error.
        message: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),

    /// I/O error while saving configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the pose mathematics.
    #[error(transparent)]
    Core(#[from] EnfCoreError),
}

impl NeuralEnfError {
    /// Shorthand for [`NeuralEnfError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type for neural_enf operations.
pub type Result<T> = std::result::Result<T, NeuralEnfError>;
