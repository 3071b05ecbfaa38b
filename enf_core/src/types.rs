//! Core types for planar poses.
//!
//! Provides 2D points, unit orientations and SE(2) poses, plus the flat
//! `[x, y, cos θ, sin θ]` embedding shared with the tensor crates.

use core::f32::consts::TAU;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Number of floats in an embedded pose: two for position, two for orientation.
pub const POSE_EMBEDDING_DIM: usize = 4;

/// A 2D point with named fields for clarity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point2 {
    /// Create a new Point2.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Create a Point2 with both components set to the same value.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    /// Convert to an array.
    #[inline]
    pub const fn as_array(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Dot product with another point (treating both as vectors).
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z-component of the 3D cross product `self × other`.
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Squared length of the vector.
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length (magnitude) of the vector.
    #[inline]
    pub fn length(self) -> f32 {
        libm::sqrtf(self.length_squared())
    }

    /// Rotate counter-clockwise by `angle` radians about the origin.
    #[inline]
    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = libm::sincosf(angle);
        Self {
            x: c * self.x - s * self.y,
            y: s * self.x + c * self.y,
        }
    }
}

impl From<[f32; 2]> for Point2 {
    #[inline]
    fn from(arr: [f32; 2]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
        }
    }
}

impl From<Point2> for [f32; 2] {
    #[inline]
    fn from(p: Point2) -> Self {
        p.as_array()
    }
}

impl From<(f32, f32)> for Point2 {
    #[inline]
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl Add for Point2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Point2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Mul<f32> for Point2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl Mul<Point2> for f32 {
    type Output = Point2;

    #[inline]
    fn mul(self, point: Point2) -> Point2 {
        point * self
    }
}

impl Div<f32> for Point2 {
    type Output = Self;

    #[inline]
    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl Neg for Point2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// A planar orientation stored as the unit vector `(cos θ, sin θ)`.
///
/// Storing the vector rather than the angle keeps the invariants free of
/// trigonometry and avoids wrap-around at ±π.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    cos: f32,
    sin: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Orientation {
    /// The zero rotation.
    pub const IDENTITY: Self = Self { cos: 1.0, sin: 0.0 };

    /// Create an orientation from an angle in radians.
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = libm::sincosf(angle);
        Self { cos, sin }
    }

    /// Create an orientation from an arbitrary direction vector.
    ///
    /// The vector is normalized; a zero vector maps to [`Orientation::IDENTITY`].
    #[inline]
    pub fn from_vector(v: Point2) -> Self {
        let len = v.length();
        if len == 0.0 {
            Self::IDENTITY
        } else {
            Self {
                cos: v.x / len,
                sin: v.y / len,
            }
        }
    }

    /// The angle in radians, in `[0, 2π)`.
    #[inline]
    pub fn angle(&self) -> f32 {
        let a = libm::atan2f(self.sin, self.cos);
        if a >= 0.0 {
            return a;
        }
        // Tiny negative angles round up to exactly 2π.
        let wrapped = a + TAU;
        if wrapped >= TAU {
            0.0
        } else {
            wrapped
        }
    }

    /// The unit direction vector.
    #[inline]
    pub const fn as_vector(&self) -> Point2 {
        Point2::new(self.cos, self.sin)
    }

    /// Cosine of the angle.
    #[inline]
    pub const fn cos(&self) -> f32 {
        self.cos
    }

    /// Sine of the angle.
    #[inline]
    pub const fn sin(&self) -> f32 {
        self.sin
    }

    /// Compose two rotations (angles add).
    #[inline]
    pub fn then(self, other: Self) -> Self {
        Self {
            cos: self.cos * other.cos - self.sin * other.sin,
            sin: self.sin * other.cos + self.cos * other.sin,
        }
    }

    /// The inverse rotation.
    #[inline]
    pub const fn inverse(self) -> Self {
        Self {
            cos: self.cos,
            sin: -self.sin,
        }
    }
}

/// An element of SE(2) used as a pose: a position and an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2 {
    /// Position in the plane.
    pub position: Point2,
    /// Heading.
    pub orientation: Orientation,
}

impl Pose2 {
    /// Create a new pose.
    #[inline]
    pub const fn new(position: Point2, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Create a pose from raw components.
    #[inline]
    pub fn from_parts(x: f32, y: f32, angle: f32) -> Self {
        Self::new(Point2::new(x, y), Orientation::from_angle(angle))
    }

    /// Flatten to `[x, y, cos θ, sin θ]`.
    #[inline]
    pub fn to_embedding(&self) -> [f32; POSE_EMBEDDING_DIM] {
        [
            self.position.x,
            self.position.y,
            self.orientation.cos,
            self.orientation.sin,
        ]
    }

    /// Inverse of [`Pose2::to_embedding`]. The orientation part is renormalized.
    #[inline]
    pub fn from_embedding(e: [f32; POSE_EMBEDDING_DIM]) -> Self {
        Self::new(
            Point2::new(e[0], e[1]),
            Orientation::from_vector(Point2::new(e[2], e[3])),
        )
    }
}
