//! Pose-pair invariants.
//!
//! An invariant `a(x, p)` describes an input point (or pose) `x` relative to a
//! latent pose `p` so that `a(g·x, g·p) = a(x, p)` for every group element `g`.
//! These are the scalar reference formulas; `neural_enf` evaluates the same
//! formulas on batched tensors.
//!
//! | kind | x pos | x ori | z pos | z ori | dim |
//! |------|-------|-------|-------|-------|-----|
//! | `PonitaPos2d` | 2 | 0 | 2 | 1 | 2 |
//! | `Ponita2d` | 2 | 1 | 2 | 1 | 3 |
//! | `RelativePosition(n)` | n | 0 | n | 0 | n |
//! | `AbsolutePosition(n)` | n | 0 | n | 0 | n |
//! | `NormRelativePosition(n)` | n | 0 | n | 0 | 1 |

use core::fmt;
use core::str::FromStr;

use crate::error::EnfCoreError;
use crate::types::{Point2, Pose2};

/// Coordinate bookkeeping for an invariant.
///
/// Orientation counts are manifold dimensions (one angle in 2D); in embedded
/// form each angle occupies two floats, `(cos θ, sin θ)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantDims {
    /// Positional dimensions of the input coordinates.
    pub num_x_pos_dims: usize,
    /// Orientation dimensions of the input coordinates.
    pub num_x_ori_dims: usize,
    /// Positional dimensions of the latent poses.
    pub num_z_pos_dims: usize,
    /// Orientation dimensions of the latent poses.
    pub num_z_ori_dims: usize,
    /// Number of output features.
    pub dim: usize,
}

impl InvariantDims {
    /// Width of an embedded input coordinate.
    #[inline]
    pub const fn x_embedding_dim(&self) -> usize {
        self.num_x_pos_dims + 2 * self.num_x_ori_dims
    }

    /// Width of an embedded latent pose.
    #[inline]
    pub const fn z_embedding_dim(&self) -> usize {
        self.num_z_pos_dims + 2 * self.num_z_ori_dims
    }
}

/// A concrete invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    /// Position of a point in the frame of a latent pose.
    PonitaPos2d,
    /// Position and heading of an oriented point in the frame of a latent pose.
    Ponita2d,
    /// `x − p`; translation invariant only.
    RelativePosition(usize),
    /// `x` itself; not invariant, kept as a baseline.
    AbsolutePosition(usize),
    /// `‖x − p‖`; invariant to rotations, reflections and translations.
    NormRelativePosition(usize),
}

impl InvariantKind {
    /// Dimension bookkeeping for this invariant.
    pub const fn dims(&self) -> InvariantDims {
        match *self {
            InvariantKind::PonitaPos2d => InvariantDims {
                num_x_pos_dims: 2,
                num_x_ori_dims: 0,
                num_z_pos_dims: 2,
                num_z_ori_dims: 1,
                dim: 2,
            },
            InvariantKind::Ponita2d => InvariantDims {
                num_x_pos_dims: 2,
                num_x_ori_dims: 1,
                num_z_pos_dims: 2,
                num_z_ori_dims: 1,
                dim: 3,
            },
            InvariantKind::RelativePosition(n) | InvariantKind::AbsolutePosition(n) => {
                InvariantDims {
                    num_x_pos_dims: n,
                    num_x_ori_dims: 0,
                    num_z_pos_dims: n,
                    num_z_ori_dims: 0,
                    dim: n,
                }
            }
            InvariantKind::NormRelativePosition(n) => InvariantDims {
                num_x_pos_dims: n,
                num_x_ori_dims: 0,
                num_z_pos_dims: n,
                num_z_ori_dims: 0,
                dim: 1,
            },
        }
    }

    /// Whether `a(g·x, g·p) = a(x, p)` holds for all of SE(2).
    pub const fn is_se2_invariant(&self) -> bool {
        matches!(
            self,
            InvariantKind::PonitaPos2d
                | InvariantKind::Ponita2d
                | InvariantKind::NormRelativePosition(_)
        )
    }

    /// Evaluate on embedded coordinates, writing `dims().dim` values into `out`.
    ///
    /// `x` and `p` must have the embedded widths from [`InvariantDims`].
    pub fn evaluate(&self, x: &[f32], p: &[f32], out: &mut [f32]) -> Result<(), EnfCoreError> {
        let dims = self.dims();
        check_len(x.len(), dims.x_embedding_dim())?;
        check_len(p.len(), dims.z_embedding_dim())?;
        check_len(out.len(), dims.dim)?;

        match *self {
            InvariantKind::PonitaPos2d => {
                let pose = Pose2::from_embedding([p[0], p[1], p[2], p[3]]);
                out.copy_from_slice(&ponita_pos_2d(Point2::new(x[0], x[1]), pose));
            }
            InvariantKind::Ponita2d => {
                let xp = Pose2::from_embedding([x[0], x[1], x[2], x[3]]);
                let pose = Pose2::from_embedding([p[0], p[1], p[2], p[3]]);
                out.copy_from_slice(&ponita_2d(xp, pose));
            }
            InvariantKind::RelativePosition(_) => relative_position(x, p, out)?,
            InvariantKind::AbsolutePosition(_) => out.copy_from_slice(x),
            InvariantKind::NormRelativePosition(_) => {
                out[0] = norm_relative_position(x, p)?;
            }
        }
        Ok(())
    }
}

/// The invariant family named in configuration files.
///
/// The same family resolves to different invariants for self-attention
/// (latent ↔ latent, both oriented) and cross-attention (coordinate ↔ latent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantType {
    /// `"ponita"`.
    Ponita,
    /// `"rel_pos"`.
    RelPos,
    /// `"abs_pos"`.
    AbsPos,
    /// `"norm_rel_pos"`.
    NormRelPos,
}

impl InvariantType {
    /// Invariant used between latents.
    pub const fn self_attention(&self, num_dims: usize) -> InvariantKind {
        match self {
            InvariantType::Ponita => InvariantKind::Ponita2d,
            InvariantType::RelPos => InvariantKind::RelativePosition(num_dims),
            InvariantType::AbsPos => InvariantKind::AbsolutePosition(num_dims),
            InvariantType::NormRelPos => InvariantKind::NormRelativePosition(num_dims),
        }
    }

    /// Invariant used between input coordinates and latents.
    pub const fn cross_attention(&self, num_dims: usize) -> InvariantKind {
        match self {
            InvariantType::Ponita => InvariantKind::PonitaPos2d,
            InvariantType::RelPos => InvariantKind::RelativePosition(num_dims),
            InvariantType::AbsPos => InvariantKind::AbsolutePosition(num_dims),
            InvariantType::NormRelPos => InvariantKind::NormRelativePosition(num_dims),
        }
    }

    /// The configuration name.
    pub const fn name(&self) -> &'static str {
        match self {
            InvariantType::Ponita => "ponita",
            InvariantType::RelPos => "rel_pos",
            InvariantType::AbsPos => "abs_pos",
            InvariantType::NormRelPos => "norm_rel_pos",
        }
    }
}

impl FromStr for InvariantType {
    type Err = EnfCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ponita" => Ok(InvariantType::Ponita),
            "rel_pos" => Ok(InvariantType::RelPos),
            "abs_pos" => Ok(InvariantType::AbsPos),
            "norm_rel_pos" => Ok(InvariantType::NormRelPos),
            _ => Err(EnfCoreError::UnknownInvariant),
        }
    }
}

impl fmt::Display for InvariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn check_len(got: usize, expected: usize) -> Result<(), EnfCoreError> {
    if got == expected {
        Ok(())
    } else {
        Err(EnfCoreError::DimensionMismatch { expected, got })
    }
}

/// Position of `x` in the frame of `p`.
///
/// With `r = x − p.pos` and `o = (cos θp, sin θp)`:
/// `[r·o, −r₀o₁ + r₁o₀]`, i.e. `R(−θp) r`.
#[inline]
pub fn ponita_pos_2d(x: Point2, p: Pose2) -> [f32; 2] {
    let r = x - p.position;
    let o = p.orientation.as_vector();
    [r.dot(o), o.cross(r)]
}

/// [`ponita_pos_2d`] plus the heading agreement `o_x · o_p = cos(θx − θp)`.
#[inline]
pub fn ponita_2d(x: Pose2, p: Pose2) -> [f32; 3] {
    let [a, b] = ponita_pos_2d(x.position, p);
    let c = x
        .orientation
        .as_vector()
        .dot(p.orientation.as_vector());
    [a, b, c]
}

/// `x − p`, component-wise.
pub fn relative_position(x: &[f32], p: &[f32], out: &mut [f32]) -> Result<(), EnfCoreError> {
    check_len(p.len(), x.len())?;
    check_len(out.len(), x.len())?;
    for ((o, a), b) in out.iter_mut().zip(x).zip(p) {
        *o = a - b;
    }
    Ok(())
}

/// `‖x − p‖`.
pub fn norm_relative_position(x: &[f32], p: &[f32]) -> Result<f32, EnfCoreError> {
    check_len(p.len(), x.len())?;
    let sq: f32 = x.iter().zip(p).map(|(a, b)| (a - b) * (a - b)).sum();
    Ok(libm::sqrtf(sq))
}
