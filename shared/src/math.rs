//! Small vector types used by the simulation and the wire protocol

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Magnitudes below this are treated as zero when normalizing
pub const EPSILON: f32 = 1e-6;

/// Two-component vector for axis input (move, look)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Three-component vector in world space, +Y up
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const DOWN: Vec3 = Vec3 {
        x: 0.0,
        y: -1.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(*self).sqrt()
    }

    /// Returns the unit vector, or zero for a (near) zero vector
    pub fn normalize_or_zero(&self) -> Vec3 {
        let mag = self.magnitude();
        if mag < EPSILON {
            Vec3::ZERO
        } else {
            *self * (1.0 / mag)
        }
    }

    /// Removes the component along `normal`, keeping the part tangent to the plane
    pub fn project_on_plane(&self, normal: Vec3) -> Vec3 {
        let n = normal.normalize_or_zero();
        *self - n * self.dot(n)
    }

    /// Scales the vector down so its magnitude does not exceed `max`
    pub fn clamp_magnitude(&self, max: f32) -> Vec3 {
        let mag = self.magnitude();
        if mag > max && mag > EPSILON {
            *self * (max / mag)
        } else {
            *self
        }
    }

    pub fn with_y(&self, y: f32) -> Vec3 {
        Vec3 { y, ..*self }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
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

    fn mul(self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
    }

    #[test]
    fn test_normalize() {
        let n = Vec3::new(3.0, 0.0, 4.0).normalize_or_zero();
        assert_approx_eq!(n.x, 0.6, 1e-6);
        assert_approx_eq!(n.z, 0.8, 1e-6);
        assert_approx_eq!(n.magnitude(), 1.0, 1e-6);
    }

    #[test]
    fn test_project_on_plane_removes_normal_component() {
        let v = Vec3::new(5.0, 0.0, 0.0);
        let n = Vec3::new(-0.707, 0.0, 0.707);
        let projected = v.project_on_plane(n);

        assert_approx_eq!(projected.dot(n.normalize_or_zero()), 0.0, 1e-5);
        assert_approx_eq!(projected.x, 2.5, 1e-3);
        assert_approx_eq!(projected.z, 2.5, 1e-3);
    }

    #[test]
    fn test_clamp_magnitude() {
        let v = Vec3::new(30.0, 0.0, 40.0).clamp_magnitude(5.0);
        assert_approx_eq!(v.magnitude(), 5.0, 1e-5);

        let short = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(short.clamp_magnitude(5.0), short);
    }

    #[test]
    fn test_is_finite() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec2::new(0.0, f32::INFINITY).is_finite());
    }
}
