//! The SE(2) group action on points, orientations and poses.

use crate::types::{Orientation, Point2, Pose2};

/// A rigid planar motion: rotate by `rotation`, then translate by `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Se2 {
    /// Rotation part.
    pub rotation: Orientation,
    /// Translation part, applied after the rotation.
    pub translation: Point2,
}

impl Se2 {
    /// The identity element.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a group element from an angle (radians) and a translation.
    #[inline]
    pub fn new(angle: f32, translation: Point2) -> Self {
        Self {
            rotation: Orientation::from_angle(angle),
            translation,
        }
    }

    /// The group element that moves the origin frame onto `pose`.
    #[inline]
    pub fn from_pose(pose: Pose2) -> Self {
        Self {
            rotation: pose.orientation,
            translation: pose.position,
        }
    }

    /// Apply only the rotation to a vector.
    #[inline]
    fn rotate(&self, v: Point2) -> Point2 {
        let (c, s) = (self.rotation.cos(), self.rotation.sin());
        Point2::new(c * v.x - s * v.y, s * v.x + c * v.y)
    }

    /// `g · x = R x + t`.
    #[inline]
    pub fn act_point(&self, p: Point2) -> Point2 {
        self.rotate(p) + self.translation
    }

    /// Orientations only feel the rotation.
    #[inline]
    pub fn act_orientation(&self, o: Orientation) -> Orientation {
        self.rotation.then(o)
    }

    /// Act on a full pose.
    #[inline]
    pub fn act_pose(&self, pose: Pose2) -> Pose2 {
        Pose2::new(
            self.act_point(pose.position),
            self.act_orientation(pose.orientation),
        )
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    #[inline]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation.then(other.rotation),
            translation: self.act_point(other.translation),
        }
    }

    /// The inverse element: `R⁻¹ (x − t)`.
    #[inline]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let inv = Self {
            rotation,
            translation: Point2::default(),
        };
        Self {
            rotation,
            translation: -inv.rotate(self.translation),
        }
    }
}

/// Express point `x` in the frame of `pose`: `pose⁻¹ · x`.
#[inline]
pub fn relative(pose: Pose2, x: Point2) -> Point2 {
    Se2::from_pose(pose).inverse().act_point(x)
}

/// Express pose `x` in the frame of `pose`.
#[inline]
pub fn relative_pose(pose: Pose2, x: Pose2) -> Pose2 {
    Se2::from_pose(pose).inverse().act_pose(x)
}
