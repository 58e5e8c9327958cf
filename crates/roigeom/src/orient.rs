//! Rotation state shared by oriented shapes.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// An angle normalized to `[0, 2π)` with cached cosine and sine.
///
/// Shapes that carry a rotation embed one of these instead of inheriting
/// from a rotated base shape. Normalization is done by repeatedly adding or
/// subtracting a full turn rather than by remainder, which preserves the
/// exact floating-point behavior of angle arithmetic near the wrap points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Orientation {
    angle: f64,
    cos: f64,
    sin: f64,
}

impl Orientation {
    /// Orientation at `angle` radians (normalized on construction).
    pub fn new(angle: f64) -> Self {
        let mut o = Self {
            angle: 0.0,
            cos: 1.0,
            sin: 0.0,
        };
        o.set_angle(angle);
        o
    }

    /// Orientation from an angle in degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Normalized angle in radians, in `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Normalized angle in degrees.
    pub fn angle_degrees(&self) -> f64 {
        self.angle.to_degrees()
    }

    /// Cached cosine of the angle.
    pub fn cos(&self) -> f64 {
        self.cos
    }

    /// Cached sine of the angle.
    pub fn sin(&self) -> f64 {
        self.sin
    }

    /// Set the angle in radians; normalizes and refreshes the cached pair.
    pub fn set_angle(&mut self, angle: f64) {
        let mut a = angle;
        while a < 0.0 {
            a += TAU;
        }
        while a >= TAU {
            a -= TAU;
        }
        self.angle = a;
        self.cos = a.cos();
        self.sin = a.sin();
    }

    /// Set the angle in degrees.
    pub fn set_angle_degrees(&mut self, degrees: f64) {
        self.set_angle(degrees.to_radians());
    }

    /// Rotate a centre-relative vector from the shape frame into the plane.
    pub fn to_global(&self, v: [f64; 2]) -> [f64; 2] {
        [
            self.cos * v[0] - self.sin * v[1],
            self.sin * v[0] + self.cos * v[1],
        ]
    }

    /// Rotate a centre-relative vector from the plane into the shape frame.
    pub fn to_local(&self, v: [f64; 2]) -> [f64; 2] {
        [
            self.cos * v[0] + self.sin * v[1],
            -self.sin * v[0] + self.cos * v[1],
        ]
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            angle: 0.0,
            cos: 1.0,
            sin: 0.0,
        }
    }
}

impl From<f64> for Orientation {
    fn from(angle: f64) -> Self {
        Self::new(angle)
    }
}

impl From<Orientation> for f64 {
    fn from(o: Orientation) -> Self {
        o.angle
    }
}
