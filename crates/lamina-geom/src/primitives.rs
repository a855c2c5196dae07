//! Leaf geometric types: lines, rays, segments, planes and triangles.

use lamina_math::{Point3, Transform, Vec3};

use crate::EPSILON;

/// An infinite line through `origin` along the unit vector `dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// A point on the line.
    pub origin: Point3,
    /// Unit direction.
    pub dir: Vec3,
}

impl Line {
    /// Create a line; `dir` is normalized.
    pub fn new(origin: Point3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// Point at parameter `t` along the line.
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.dir * t
    }
}

/// A half-line starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Point3,
    /// Unit direction.
    pub dir: Vec3,
}

impl Ray {
    /// Create a ray; `dir` is normalized.
    pub fn new(origin: Point3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// The supporting line.
    pub fn line(&self) -> Line {
        Line {
            origin: self.origin,
            dir: self.dir,
        }
    }
}

/// A straight segment between two owned endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First endpoint.
    pub a: Point3,
    /// Second endpoint.
    pub b: Point3,
}

impl Segment {
    /// Create a segment.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self { a, b }
    }

    /// Vector from `a` to `b`.
    pub fn direction(&self) -> Vec3 {
        self.b - self.a
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Squared length.
    pub fn length_sq(&self) -> f64 {
        self.direction().norm_squared()
    }

    /// Exchange the endpoints.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    /// The segment with endpoints transformed.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self::new(t.apply_point(&self.a), t.apply_point(&self.b))
    }
}

/// A plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3,
    /// Unit normal.
    pub normal: Vec3,
}

impl Plane {
    /// Create a plane; `normal` is normalized.
    pub fn new(origin: Point3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
        }
    }

    /// The horizontal plane at height `z`.
    pub fn z_plane(z: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, z),
            normal: Vec3::z(),
        }
    }

    /// Coefficients `(a, b, c, d)` of `ax + by + cz + d = 0`.
    pub fn formula(&self) -> (f64, f64, f64, f64) {
        let n = self.normal;
        (n.x, n.y, n.z, -n.dot(&self.origin.coords))
    }

    /// Signed distance of `p` along the normal.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&(p - self.origin))
    }

    /// Whether `p` lies on the plane.
    pub fn contains(&self, p: &Point3) -> bool {
        self.signed_distance(p).abs() < EPSILON
    }
}

/// A mesh facet with three owned vertices and a facet normal.
///
/// The normal is stored as read and only re-derived by
/// [`Triangle::recompute_normal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub a: Point3,
    /// Second vertex.
    pub b: Point3,
    /// Third vertex.
    pub c: Point3,
    /// Outward facet normal.
    pub normal: Vec3,
}

impl Triangle {
    /// Create a triangle with an explicit normal.
    pub fn new(a: Point3, b: Point3, c: Point3, normal: Vec3) -> Self {
        Self { a, b, c, normal }
    }

    /// Create a triangle whose normal follows the vertex winding.
    pub fn from_vertices(a: Point3, b: Point3, c: Point3) -> Self {
        let mut t = Self::new(a, b, c, Vec3::zeros());
        t.recompute_normal();
        t
    }

    /// Vertices as an array.
    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// Lowest vertex height.
    pub fn z_min(&self) -> f64 {
        self.a.z.min(self.b.z).min(self.c.z)
    }

    /// Highest vertex height.
    pub fn z_max(&self) -> f64 {
        self.a.z.max(self.b.z).max(self.c.z)
    }

    /// Re-derive the normal from the vertex winding (right-hand rule).
    pub fn recompute_normal(&mut self) -> Vec3 {
        let n = (self.b - self.a).cross(&(self.c - self.a));
        self.normal = if n.norm_squared() > 0.0 {
            n.normalize()
        } else {
            Vec3::zeros()
        };
        self.normal
    }

    /// Area of the facet.
    pub fn area(&self) -> f64 {
        (self.b - self.a).cross(&(self.c - self.a)).norm() * 0.5
    }

    /// The triangle with vertices and normal transformed.
    pub fn transformed(&self, t: &Transform) -> Self {
        let n = t.apply_normal(&self.normal);
        let normal = if n.norm_squared() > 0.0 {
            n.normalize()
        } else {
            n
        };
        Self::new(
            t.apply_point(&self.a),
            t.apply_point(&self.b),
            t.apply_point(&self.c),
            normal,
        )
    }
}
