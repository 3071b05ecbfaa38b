//! # enf_core
//!
//! Pure mathematics for equivariant neural fields on the plane.
//!
//! This crate provides the group-theoretic foundation for the ENF ecosystem:
//! poses, the SE(2) action, and the pose-pair invariants that make a neural
//! field's output independent of a global rotation and translation of its
//! latent point cloud.
//!
//! ## Features
//!
//! - **no_std compatible**: No heap allocation anywhere in the crate
//! - **Pure algorithms**: No tensors, just the reference formulas
//! - **Invariant catalogue**: Ponita (position and position+heading), relative,
//!   absolute and norm-relative position
//!
//! ## Feature Flags
//!
//! - `std` (default): Implements `std::error::Error` for [`EnfCoreError`]
//!
//! ## Modules
//!
//! - [`types`]: Point2, Orientation, Pose2
//! - [`group`]: The SE(2) action and relative frames
//! - [`invariant`]: Invariant formulas and their dimension bookkeeping
//! - [`latent_grid`]: Initial latent placement
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```
//! use enf_core::prelude::*;
//!
//! let latent = Pose2::from_parts(0.5, 0.0, core::f32::consts::FRAC_PI_2);
//! let x = Point2::new(0.5, 1.0);
//!
//! // One unit straight ahead of the latent.
//! let [ahead, side] = ponita_pos_2d(x, latent);
//! assert!((ahead - 1.0).abs() < 1e-6 && side.abs() < 1e-6);
//!
//! // Moving everything together changes nothing.
//! let g = Se2::new(0.3, Point2::new(2.0, -1.0));
//! let [a2, s2] = ponita_pos_2d(g.act_point(x), g.act_pose(latent));
//! assert!((a2 - ahead).abs() < 1e-5 && (s2 - side).abs() < 1e-5);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod group;
pub mod invariant;
pub mod latent_grid;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::EnfCoreError;
    pub use crate::group::{relative, relative_pose, Se2};
    pub use crate::invariant::{
        norm_relative_position, ponita_2d, ponita_pos_2d, relative_position, InvariantDims,
        InvariantKind, InvariantType,
    };
    pub use crate::latent_grid::{latent_grid_positions, latent_grid_side, latent_grid_spacing};
    pub use crate::types::{Orientation, Point2, Pose2, POSE_EMBEDDING_DIM};
}

pub use error::EnfCoreError;
pub use group::{relative, relative_pose, Se2};
pub use invariant::{
    norm_relative_position, ponita_2d, ponita_pos_2d, relative_position, InvariantDims,
    InvariantKind, InvariantType,
};
pub use latent_grid::{latent_grid_positions, latent_grid_side, latent_grid_spacing};
pub use types::{Orientation, Point2, Pose2, POSE_EMBEDDING_DIM};
