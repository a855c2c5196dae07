#![warn(missing_docs)]

//! Math types for the lamina slicer.
//!
//! Thin wrappers around nalgebra: points, vectors, affine transforms for
//! placing a mesh on the build plate, and the named tolerances every
//! tolerance-sensitive stage reads from.

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in the slice plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the slice plane.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation about X by `ax`, then Y by `ay`, then Z by `az`.
    ///
    /// This is the placement used when searching for a print orientation.
    pub fn rotation_xyz(ax: f64, ay: f64, az: f64) -> Self {
        Self::rotation_z(az)
            .then(&Self::rotation_y(ay))
            .then(&Self::rotation_x(ax))
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Reflection across the plane through `origin` with unit normal `normal`.
    pub fn mirror(origin: &Point3, normal: &Dir3) -> Self {
        let n = normal.as_ref();
        let d = -n.dot(&origin.coords);
        let mut m = Matrix4::identity();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] -= 2.0 * n[r] * n[c];
            }
            m[(r, 3)] = -2.0 * n[r] * d;
        }
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector (uses inverse transpose of upper-left 3x3).
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        if let Some(inv) = m3.try_inverse() {
            inv.transpose() * n
        } else {
            *n
        }
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Named tolerances for every tolerance-sensitive comparison in the slicer.
///
/// The values are empirical per use site. They are collected here so a job
/// can tune them from its configuration file instead of editing code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Absolute coordinate tolerance (mm).
    pub epsilon: f64,
    /// Tolerance on squared distances (mm²).
    pub epsilon_sq: f64,
    /// Decimal digits kept when coordinates become dictionary keys.
    pub key_digits: i32,
    /// Coincidence tolerance for the sort-based segment linker (mm).
    pub link_sort: f64,
    /// Regions smaller than this are treated as quantization noise (mm²).
    pub min_region_area: f64,
    /// Outward inflation of the neighbouring layer during end-face detection (mm).
    pub safety_inflate: f64,
    /// Offset used to clean linked contours (mm).
    pub clean_precision: f64,
    /// Margin added around the scan-line range during hatching (mm).
    pub scan_margin: f64,
    /// Half-width of the rectangle cut out when splitting a region (mm).
    pub split_half_width: f64,
    /// Largest gap an open contour may have and still be force-closed (mm).
    pub heal_gap: f64,
    /// Slack below the wall thickness at which a neighbouring layer stops
    /// limiting the hollowing offset (mm).
    pub hollow_reach: f64,
    /// Slack below the wall thickness at which a layer counts as a cap and
    /// stays solid (mm).
    pub hollow_cap: f64,
}

impl Tolerance {
    /// Default slicing tolerances.
    pub const DEFAULT: Self = Self {
        epsilon: 1e-7,
        epsilon_sq: 1e-14,
        key_digits: 7,
        link_sort: 1e-5,
        min_region_area: 1.0,
        safety_inflate: 0.1,
        clean_precision: 0.02,
        scan_margin: 1e-5,
        split_half_width: 1e-4,
        heal_gap: 0.5,
        hollow_reach: 1e-5,
        hollow_cap: 0.01,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm_squared() < self.epsilon_sq
    }

    /// Check if a scalar is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.epsilon
    }

    /// Round a coordinate to [`Tolerance::key_digits`] decimals and return it
    /// as an integer suitable for hashing.
    pub fn key(&self, v: f64) -> i64 {
        (v * 10f64.powi(self.key_digits)).round() as i64
    }

    /// Integer key of a 3D point.
    pub fn point_key(&self, p: &Point3) -> [i64; 3] {
        [self.key(p.x), self.key(p.y), self.key(p.z)]
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.y - 22.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_xyz_applies_x_first() {
        // (0,1,0) -> X 90° -> (0,0,1) -> Y 90° -> (1,0,0)
        let t = Transform::rotation_xyz(PI / 2.0, PI / 2.0, 0.0);
        let r = t.apply_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(r.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_applies_right_first() {
        let t1 = Transform::translation(1.0, 0.0, 0.0);
        let t2 = Transform::scale(2.0, 2.0, 2.0);
        let result = t2.then(&t1).apply_point(&Point3::origin());
        assert!((result.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        let t = Transform::rotation_x(0.3).then(&Transform::translation(1.0, 2.0, 3.0));
        let inv = t.inverse().unwrap();
        let p = Point3::new(5.0, 6.0, 7.0);
        let result = inv.apply_point(&t.apply_point(&p));
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_about_axis() {
        let axis = Dir3::new_normalize(Vec3::new(1.0, 1.0, 0.0));
        let t = Transform::rotation_about_axis(&axis, PI);
        let r = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(r.x.abs() < 1e-12);
        assert!((r.y - 1.0).abs() < 1e-12);
        assert!(r.z.abs() < 1e-12);
    }

    #[test]
    fn test_mirror_across_offset_plane() {
        let t = Transform::mirror(&Point3::new(0.0, 0.0, 5.0), &Dir3::new_normalize(Vec3::z()));
        let r = t.apply_point(&Point3::new(1.0, 2.0, 7.0));
        assert_relative_eq!(r.z, 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.x, 1.0, epsilon = 1e-12);
        // Mirroring twice is the identity.
        let back = t.apply_point(&r);
        assert_relative_eq!(back.z, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_under_nonuniform_scale() {
        let t = Transform::scale(2.0, 1.0, 1.0);
        let n = t.apply_normal(&Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(n.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(n.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tolerance_keys() {
        let tol = Tolerance::DEFAULT;
        assert_eq!(tol.key(1.000_000_04), tol.key(1.0));
        assert_ne!(tol.key(1.000_000_2), tol.key(1.0));
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-8, 2.0, 3.0);
        assert!(tol.points_equal(&a, &b));
        assert_eq!(tol.point_key(&a), tol.point_key(&b));
    }
}
