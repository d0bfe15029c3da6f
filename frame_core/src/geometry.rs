//! # Geometry
//!
//! Three-dimensional vector type and the joint-offset math. Both rigid-end
//! strategies take their effective member ends from [`joint_offsets`].
//!
//! ## Joint offsets
//!
//! For a member from `p_i` to `p_j` with unit axis `e`:
//!
//! ```text
//! d_i =  L_i * e + Δ_i      (axial rigid end, pointing inward from I, plus lateral eccentricity)
//! d_j = -L_j * e + Δ_j      (axial rigid end, pointing inward from J, plus lateral eccentricity)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use frame_core::geometry::{joint_offsets, EndOffsetInput, Vec3};
//!
//! let offsets = joint_offsets(
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(10.0, 0.0, 0.0),
//!     &EndOffsetInput { length_i: 0.4, ..Default::default() },
//!     1e-6,
//! ).unwrap();
//!
//! assert!((offsets.i.x - 0.4).abs() < 1e-12);
//! assert!(offsets.j.is_zero(1e-12));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

// ============================================================================
// Vector
// ============================================================================

/// Point or displacement in model space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Vec3) -> f64 {
        (other - self).norm()
    }

    /// Unit vector, or `None` when the length is at or below `tolerance`
    pub fn unit(self, tolerance: f64) -> Option<Vec3> {
        let n = self.norm();
        if n <= tolerance {
            None
        } else {
            Some(self * (1.0 / n))
        }
    }

    /// True when every component is within `tolerance` of zero
    pub fn is_zero(self, tolerance: f64) -> bool {
        self.x.abs() <= tolerance && self.y.abs() <= tolerance && self.z.abs() <= tolerance
    }

    /// Squared distance in the XY plane
    pub fn planar_distance_sq(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
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

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

// ============================================================================
// Joint offsets
// ============================================================================

/// Scalar end-offset parameters of one member, as read from its line assignment
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EndOffsetInput {
    /// Axial rigid length at the I end
    pub length_i: f64,
    /// Axial rigid length at the J end
    pub length_j: f64,
    /// Lateral eccentricity at the I end
    pub lateral_i: Vec3,
    /// Lateral eccentricity at the J end
    pub lateral_j: Vec3,
}

impl EndOffsetInput {
    /// The same offsets seen from a member running the other way
    pub fn swapped(&self) -> Self {
        EndOffsetInput {
            length_i: self.length_j,
            length_j: self.length_i,
            lateral_i: self.lateral_j,
            lateral_j: self.lateral_i,
        }
    }
}

/// Joint offset vectors at both ends of a member
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EndOffsets {
    pub i: Vec3,
    pub j: Vec3,
}

impl EndOffsets {
    pub fn is_zero(&self, tolerance: f64) -> bool {
        self.i.is_zero(tolerance) && self.j.is_zero(tolerance)
    }
}

/// Compute the joint offset vectors of a member.
///
/// Returns `None` when the member length is at or below `tolerance`, since the
/// axis direction is then undefined.
pub fn joint_offsets(p_i: Vec3, p_j: Vec3, input: &EndOffsetInput, tolerance: f64) -> Option<EndOffsets> {
    let axis = (p_j - p_i).unit(tolerance)?;
    Some(EndOffsets {
        i: axis * input.length_i + input.lateral_i,
        j: -axis * input.length_j + input.lateral_j,
    })
}

/// Local x-z reference vector for a member's geometric transform.
///
/// Horizontal and sloped members use global Z; members within `tolerance` of
/// vertical use global X.
pub fn transform_reference(p_i: Vec3, p_j: Vec3, tolerance: f64) -> Vec3 {
    let axis = p_j - p_i;
    let horizontal = (axis.x * axis.x + axis.y * axis.y).sqrt();
    if horizontal <= tolerance {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 0.0, 1.0)
    }
}

// ============================================================================
// Planar helpers
// ============================================================================

/// Area of the convex hull of a set of XY points (Andrew's monotone chain)
pub fn convex_hull_area(points: &[(f64, f64)]) -> f64 {
    let mut pts: Vec<(f64, f64)> = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pts.dedup();
    if pts.len() < 3 {
        return 0.0;
    }

    fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    let n = lower.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|k| {
            let (x1, y1) = lower[k];
            let (x2, y2) = lower[(k + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    twice.abs() * 0.5
}
