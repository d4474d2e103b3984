//! Cartesian ↔ spherical viewing coordinates.
//!
//! A [`Spherical`] sample is `(r, theta, phi)` where `r` is the radial
//! distance, `theta` the longitude (signed angle in the xz-plane measured
//! clockwise from +Z) and `phi` the latitude (signed angle measured upwards
//! from the xz-plane; +Y points down in the sensor frame).
//!
//! ```text
//! r     = sqrt(x² + y² + z²)
//! theta = atan(x / z)
//! phi   = asin(−y / r)
//! ```
//!
//! # Singularities
//!
//! `theta` is derived with `atan`, not `atan2`, so it only spans
//! `(−π/2, π/2)` and loses the sign of `z`: a point behind the sensor maps
//! to the same angles as its mirror image in front of it.  The conversions
//! are therefore only mutual inverses for `z > 0`.  They also produce NaN at
//! - `r = 0` (`phi` is `asin(0/0)`),
//! - `x = z = 0` (`theta` is `atan(0/0)`),
//! - `theta = 0` on the way back (`z = x / tan(0)` is `0/0`).
//!
//! These are not guarded here; callers that need finite output check
//! [`Spherical::is_finite`].
//!
//! # Example
//!
//! ```rust
//! use sonilize_perception::{Point3, Spherical};
//!
//! let p = Point3::new(0.3, -0.2, 1.0);
//! let s = Spherical::of(p);
//! let back = s.to_cartesian();
//! assert!((back.x - p.x).abs() < 1e-5);
//! assert!((back.z - p.z).abs() < 1e-5);
//! ```

use crate::point_cloud::Point3;

/// A point in `(r, theta, phi)` viewing coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    /// Radial distance (metres, ≥ 0).
    pub r: f32,
    /// Horizontal angle (radians).
    pub theta: f32,
    /// Vertical angle (radians).
    pub phi: f32,
}

impl Spherical {
    pub fn new(r: f32, theta: f32, phi: f32) -> Self {
        Self { r, theta, phi }
    }

    /// Spherical coordinates of the cartesian point `p`.
    pub fn of(p: Point3) -> Self {
        let r = (p.x * p.x + p.y * p.y + p.z * p.z).sqrt();
        let theta = (p.x / p.z).atan();
        let phi = (-p.y / r).asin();
        Self { r, theta, phi }
    }

    /// Cartesian point for these spherical coordinates.
    ///
    /// `z` is recovered as `x / tan(theta)`, which is NaN at `theta = 0`.
    pub fn to_cartesian(self) -> Point3 {
        let y = -self.r * self.phi.sin();
        let x = self.r * self.phi.cos() * self.theta.sin();
        let z = x / self.theta.tan();
        Point3::new(x, y, z)
    }

    /// True when all three components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.theta.is_finite() && self.phi.is_finite()
    }
}

impl From<Point3> for Spherical {
    fn from(p: Point3) -> Self {
        Self::of(p)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
