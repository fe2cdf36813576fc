//! Math type re-exports and volume-rendering helpers.
//!
//! This module re-exports types from `glam` and provides the axis-aligned
//! box used to clip rays against the scene bound.

pub use glam::{Mat3, Mat4, Quat, UVec3, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 3D axis-aligned bounding box with single precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The scene bound: the unit cube `[0, 1]^3`.
    pub const UNIT: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ONE,
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check whether a point lies inside the box (inclusive).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test against a ray.
    ///
    /// Returns the parametric interval `(t0, t1)`; the ray misses when
    /// `t0 > t1`. Zero direction components produce infinite slabs, and the
    /// NaN-ignoring `f32::min`/`f32::max` keep those axes from poisoning the
    /// result.
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> (f32, f32) {
        let inv_dir = dir.recip();
        let mut t0 = f32::NEG_INFINITY;
        let mut t1 = f32::INFINITY;
        for axis in 0..3 {
            let a = (self.min[axis] - origin[axis]) * inv_dir[axis];
            let b = (self.max[axis] - origin[axis]) * inv_dir[axis];
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
        (t0, t1)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::UNIT
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

/// Logistic sigmoid, applied per component.
#[inline]
pub fn sigmoid(v: Vec3) -> Vec3 {
    Vec3::ONE / (Vec3::ONE + (-v).exp())
}

/// GLSL-style `mod`: result has the sign of `y`.
#[inline]
pub fn wrap(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_box() {
        let b = Aabb::UNIT;
        assert!(!b.is_empty());
        assert_eq!(b.center(), Vec3::splat(0.5));
        assert!(b.contains(Vec3::splat(0.25)));
        assert!(!b.contains(Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_ray_hits_box() {
        let (t0, t1) = Aabb::UNIT.intersect_ray(Vec3::new(0.5, 0.5, -1.0), Vec3::Z);
        assert!((t0 - 1.0).abs() < 1e-6);
        assert!((t1 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_ray_misses_box() {
        let (t0, t1) = Aabb::UNIT.intersect_ray(Vec3::new(2.0, 2.0, -1.0), Vec3::Z);
        assert!(t0 > t1);

        // Pointing away: both slabs behind the origin still yields an interval,
        // the marcher clamps t to zero.
        let (t0, t1) = Aabb::UNIT.intersect_ray(Vec3::new(0.5, 0.5, 3.0), Vec3::Z);
        assert!(t1 < 0.0 && t0 <= t1);
    }

    #[test]
    fn test_sigmoid_and_wrap() {
        assert_eq!(sigmoid(Vec3::ZERO), Vec3::splat(0.5));
        let w = wrap(-1.0, std::f32::consts::TAU);
        assert!((w - (std::f32::consts::TAU - 1.0)).abs() < 1e-6);
        assert!((wrap(7.0, 3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_aabb_pod() {
        assert_eq!(std::mem::size_of::<Aabb>(), 24);
    }
}
