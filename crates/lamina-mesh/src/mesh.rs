//! Triangle-soup mesh container.

use lamina_geom::Triangle;
use lamina_math::{Point3, Transform, Vec3};

/// Axis-aligned bounds of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds {
    /// Size along each axis.
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }
}

/// An immutable-by-convention set of facets.
///
/// Slicing stages only ever borrow a mesh; placement operations return a
/// new mesh instead of editing shared facets.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Facets in file order.
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a mesh from facets.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Closed axis-aligned box with outward-facing facets (12 triangles).
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        let v = [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ];
        let faces: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self::new(
            faces
                .iter()
                .map(|f| Triangle::from_vertices(v[f[0]], v[f[1]], v[f[2]]))
                .collect(),
        )
    }

    /// Number of facets.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh has no facets.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounds over all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.triangles.first()?.a;
        let mut min = first;
        let mut max = first;
        for tri in &self.triangles {
            for p in tri.vertices() {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                min.z = min.z.min(p.z);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
                max.z = max.z.max(p.z);
            }
        }
        Some(Bounds { min, max })
    }

    /// A copy with every facet transformed.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self::new(self.triangles.iter().map(|tri| tri.transformed(t)).collect())
    }

    /// A copy rotated about X by `ax`, then Y by `ay`, then Z by `az`.
    pub fn rotated(&self, ax: f64, ay: f64, az: f64) -> Self {
        self.transformed(&Transform::rotation_xyz(ax, ay, az))
    }

    /// A copy translated so that its lowest point sits on `z = 0`.
    pub fn on_plate(&self) -> Self {
        match self.bounds() {
            Some(b) => self.transformed(&Transform::translation(0.0, 0.0, -b.min.z)),
            None => self.clone(),
        }
    }

    /// Re-derive every facet normal from its winding.
    pub fn recompute_normals(&mut self) {
        for tri in &mut self.triangles {
            tri.recompute_normal();
        }
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }
}

impl From<Vec<Triangle>> for Mesh {
    fn from(triangles: Vec<Triangle>) -> Self {
        Self::new(triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cuboid_bounds_and_normals() {
        let m = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(50.0, 50.0, 30.0));
        assert_eq!(m.len(), 12);
        let b = m.bounds().unwrap();
        assert_eq!(b.max, Point3::new(50.0, 50.0, 30.0));
        let c = b.center();
        // Every normal points away from the center.
        for tri in &m.triangles {
            let centroid = Point3::from((tri.a.coords + tri.b.coords + tri.c.coords) / 3.0);
            assert!(tri.normal.dot(&(centroid - c)) > 0.0);
        }
        assert_relative_eq!(m.surface_area(), 2.0 * (2500.0 + 1500.0 + 1500.0), epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_swaps_extents() {
        let m = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 20.0, 30.0));
        let r = m.rotated(FRAC_PI_2, 0.0, 0.0).on_plate();
        let b = r.bounds().unwrap();
        assert_relative_eq!(b.extents().z, 20.0, epsilon = 1e-9);
        assert_relative_eq!(b.extents().y, 30.0, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::default().bounds().is_none());
    }
}
