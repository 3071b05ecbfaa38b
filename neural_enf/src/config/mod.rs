//! Configuration types for neural_enf.
//!
//! This module provides Burn-style configuration structs for the field model,
//! the datasets it is fitted to, autodecoding and meta-learning.

mod experiment;
mod nef;

pub use experiment::{DatasetConfig, ExperimentConfig, FitConfig, MetaConfig};
pub use nef::NefConfig;
