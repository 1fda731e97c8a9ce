//! Minimal 3D vector used for locations and facing directions.
//!
//! Z is up. "2D" operations drop Z and work on the ground plane, which is how
//! interaction checks treat distance and facing unless told otherwise.
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance used for near-zero comparisons.
pub const SMALL_NUMBER: f32 = 1.0e-4;

/// World-space vector (location or direction).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Unit forward axis (+X).
    pub const FORWARD: Self = Self::new(1.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared_2d(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length_2d(self) -> f32 {
        self.length_squared_2d().sqrt()
    }

    /// Euclidean distance between two points.
    pub fn dist(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Distance on the ground plane (Z ignored).
    pub fn dist_2d(self, other: Self) -> f32 {
        (other - self).length_2d()
    }

    /// Distance in 2D or 3D depending on `flat`.
    pub fn dist_by(self, other: Self, flat: bool) -> f32 {
        if flat {
            self.dist_2d(other)
        } else {
            self.dist(other)
        }
    }

    /// Returns this vector with Z dropped.
    pub fn flatten(self) -> Self {
        Self::new(self.x, self.y, 0.0)
    }

    /// Unit vector in the same direction, or zero if the vector is degenerate.
    pub fn safe_normal(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= SMALL_NUMBER * SMALL_NUMBER {
            return Self::ZERO;
        }
        self * (1.0 / len_sq.sqrt())
    }

    /// Unit vector on the ground plane, or zero if degenerate.
    pub fn safe_normal_2d(self) -> Self {
        self.flatten().safe_normal()
    }

    pub fn is_nearly_zero(self) -> bool {
        self.length_squared() <= SMALL_NUMBER * SMALL_NUMBER
    }

    /// Heading of this vector around the up axis, in radians.
    pub fn yaw(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotates the vector around the up axis by `yaw` radians.
    pub fn rotate_yaw(self, yaw: f32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 100.0);
        assert_eq!(a.dist_2d(b), 5.0);
        assert!(a.dist(b) > 100.0);
        assert_eq!(a.dist_by(b, true), 5.0);
    }

    #[test]
    fn degenerate_vectors_normalize_to_zero() {
        assert_eq!(Vec3::ZERO.safe_normal(), Vec3::ZERO);
        assert_eq!(Vec3::new(0.0, 0.0, 7.0).safe_normal_2d(), Vec3::ZERO);
    }

    #[test]
    fn rotate_yaw_quarter_turn() {
        let rotated = Vec3::FORWARD.rotate_yaw(std::f32::consts::FRAC_PI_2);
        assert!(rotated.x.abs() < 1.0e-6);
        assert!((rotated.y - 1.0).abs() < 1.0e-6);
    }
}
