//! Topological slicing by walking a half-edge graph.
//!
//! Shared vertices are merged by their rounded coordinates and each
//! half-edge is paired with the opposite half-edge of the same undirected
//! edge. Per height, a walk starts at any unused face crossing the plane
//! and steps to the edge-adjacent face across the exit edge, so contours
//! come out already ordered. A mesh that is not manifold simply produces
//! open contours where the walk breaks.
//!
//! Vertices lying on the plane count as above it. Every crossing face then
//! cuts exactly two of its edges, and faces touching the plane only at a
//! vertex or along an edge from above are not cut at all.

use std::collections::HashMap;

use lamina_geom::{adjust_polygon_dirs, Polyline, Triangle};
use lamina_math::{Point3, Tolerance};
use rayon::prelude::*;
use tracing::debug;

use crate::layer::Layer;

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    from: usize,
    to: usize,
    opposite: Option<usize>,
}

/// Half-edge view of a triangle soup, built once and sliced many times.
#[derive(Debug, Clone)]
pub struct TopoSlicer {
    vertices: Vec<Point3>,
    half_edges: Vec<HalfEdge>,
    z_range: Vec<(f64, f64)>,
    by_z_min: Vec<usize>,
    tol: Tolerance,
}

impl TopoSlicer {
    /// Build the half-edge graph with default tolerances.
    pub fn new(triangles: &[Triangle]) -> Self {
        Self::with_tolerance(triangles, Tolerance::DEFAULT)
    }

    /// Build the half-edge graph.
    pub fn with_tolerance(triangles: &[Triangle], tol: Tolerance) -> Self {
        let mut vertices = Vec::new();
        let mut index: HashMap<[i64; 3], usize> = HashMap::new();
        let mut vertex_id = |p: &Point3| {
            *index.entry(tol.point_key(p)).or_insert_with(|| {
                vertices.push(*p);
                vertices.len() - 1
            })
        };

        let mut half_edges = Vec::with_capacity(triangles.len() * 3);
        for tri in triangles {
            let ids = tri.vertices().map(|p| vertex_id(&p));
            for k in 0..3 {
                half_edges.push(HalfEdge {
                    from: ids[k],
                    to: ids[(k + 1) % 3],
                    opposite: None,
                });
            }
        }

        let mut by_edge: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (i, he) in half_edges.iter().enumerate() {
            by_edge
                .entry((he.from.min(he.to), he.from.max(he.to)))
                .or_default()
                .push(i);
        }
        // Only edges shared by exactly two faces are walkable.
        for shared in by_edge.values() {
            if let [a, b] = shared[..] {
                half_edges[a].opposite = Some(b);
                half_edges[b].opposite = Some(a);
            }
        }

        let z_range: Vec<(f64, f64)> = triangles.iter().map(|t| (t.z_min(), t.z_max())).collect();
        let mut by_z_min: Vec<usize> = (0..triangles.len()).collect();
        by_z_min.sort_by(|&a, &b| z_range[a].0.total_cmp(&z_range[b].0));

        Self {
            vertices,
            half_edges,
            z_range,
            by_z_min,
            tol,
        }
    }

    /// Number of merged vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.z_range.len()
    }

    /// Half-edges without a unique opposite (boundary or non-manifold).
    pub fn unpaired_edge_count(&self) -> usize {
        self.half_edges.iter().filter(|h| h.opposite.is_none()).count()
    }

    /// Slice at every height, in parallel.
    pub fn slice(&self, heights: &[f64]) -> Vec<Layer> {
        heights.par_iter().map(|&z| self.slice_at(z)).collect()
    }

    /// Walk all contours at height `z`.
    pub fn slice_at(&self, z: f64) -> Layer {
        let end = self.by_z_min.partition_point(|&f| self.z_range[f].0 <= z);
        let active: Vec<usize> = self.by_z_min[..end]
            .iter()
            .copied()
            .filter(|&f| self.z_range[f].1 >= z)
            .collect();

        let mut used = vec![false; self.face_count()];
        let mut budget = active.len() * 10;
        let mut closed = Vec::new();
        let mut open = Vec::new();

        for &seed in &active {
            if used[seed] {
                continue;
            }
            let Some([e0, e1]) = self.cut_edges(seed, z) else {
                continue;
            };
            used[seed] = true;
            let mut contour = Polyline::new();
            contour.push(self.crossing(e0, z));
            push_distinct(&mut contour, self.crossing(e1, z), &self.tol);

            let mut is_closed = self.extend(z, seed, e1, &mut used, &mut contour, &mut budget);
            if !is_closed {
                contour.reverse();
                is_closed = self.extend(z, seed, e0, &mut used, &mut contour, &mut budget);
            }

            if is_closed {
                contour.simplify_collinear(self.tol.epsilon);
                if contour.len() >= 4 {
                    closed.push(contour);
                }
            } else if contour.len() >= 2 {
                open.push(contour);
            }
        }

        adjust_polygon_dirs(&mut closed);
        if !open.is_empty() {
            debug!(z, open = open.len(), "Topological walk left open contours");
        }
        let mut layer = Layer::with_contours(z, closed);
        layer.open_contours = open;
        layer
    }

    /// Follow exit edges from `exit` until the walk returns to `seed`
    /// (closed) or breaks.
    fn extend(
        &self,
        z: f64,
        seed: usize,
        mut exit: usize,
        used: &mut [bool],
        contour: &mut Polyline,
        budget: &mut usize,
    ) -> bool {
        while *budget > 0 {
            *budget -= 1;
            let Some(entry) = self.half_edges[exit].opposite else {
                return false;
            };
            let face = entry / 3;
            if face == seed {
                push_distinct(contour, self.crossing(entry, z), &self.tol);
                return contour.is_closed();
            }
            if used[face] {
                return false;
            }
            let next = match self.cut_edges(face, z) {
                Some([a, b]) if a == entry => b,
                Some([a, b]) if b == entry => a,
                _ => return false,
            };
            used[face] = true;
            push_distinct(contour, self.crossing(next, z), &self.tol);
            exit = next;
        }
        false
    }

    fn below(&self, v: usize, z: f64) -> bool {
        self.vertices[v].z < z - self.tol.epsilon
    }

    /// The two half-edges of `face` crossing the plane, in face order.
    fn cut_edges(&self, face: usize, z: f64) -> Option<[usize; 2]> {
        let mut cut = [0; 2];
        let mut n = 0;
        for he in 3 * face..3 * face + 3 {
            let e = &self.half_edges[he];
            if self.below(e.from, z) != self.below(e.to, z) {
                if n == 2 {
                    return None;
                }
                cut[n] = he;
                n += 1;
            }
        }
        (n == 2).then_some(cut)
    }

    /// Crossing point of a half-edge, computed from its endpoints in
    /// vertex-id order so both half-edges of an edge agree bit for bit.
    fn crossing(&self, he: usize, z: f64) -> Point3 {
        let e = &self.half_edges[he];
        let a = self.vertices[e.from.min(e.to)];
        let b = self.vertices[e.from.max(e.to)];
        let dz = b.z - a.z;
        if dz.abs() < self.tol.epsilon {
            return Point3::new(a.x, a.y, z);
        }
        let t = ((z - a.z) / dz).clamp(0.0, 1.0);
        Point3::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t, z)
    }
}

fn push_distinct(contour: &mut Polyline, p: Point3, tol: &Tolerance) {
    if contour.end().map_or(true, |last| !tol.points_equal(last, &p)) {
        contour.push(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::{layer_heights, slice_sweep};
    use lamina_geom::Segment;
    use lamina_mesh::Mesh;

    fn cube() -> Mesh {
        Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(50.0, 50.0, 30.0))
    }

    #[test]
    fn test_graph_of_cube() {
        let topo = TopoSlicer::new(&cube().triangles);
        assert_eq!(topo.vertex_count(), 8);
        assert_eq!(topo.face_count(), 12);
        assert_eq!(topo.unpaired_edge_count(), 0);
    }

    #[test]
    fn test_cube_contours() {
        let layers = TopoSlicer::new(&cube().triangles).slice(&layer_heights(0.0, 30.0, 5.0));
        assert_eq!(layers.len(), 5);
        for layer in &layers {
            assert_eq!(layer.contours.len(), 1);
            assert!(layer.open_contours.is_empty());
            let c = &layer.contours[0];
            assert!(c.is_closed());
            assert_eq!(c.len() - 1, 4);
            assert!((c.signed_area() - 2500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_walk_closes_without_repeating_the_seed() {
        let topo = TopoSlicer::new(&cube().triangles);
        let mut used = vec![false; topo.face_count()];
        let seed = (0..topo.face_count())
            .find(|&f| topo.cut_edges(f, 15.0).is_some())
            .unwrap();
        let [e0, e1] = topo.cut_edges(seed, 15.0).unwrap();
        used[seed] = true;
        let mut contour = Polyline::new();
        contour.push(topo.crossing(e0, 15.0));
        push_distinct(&mut contour, topo.crossing(e1, 15.0), &topo.tol);
        let mut budget = 100;
        assert!(topo.extend(15.0, seed, e1, &mut used, &mut contour, &mut budget));
        assert!(contour.is_closed());
        let n = contour.len();
        assert!((contour.points[n - 1] - contour.points[n - 2]).norm() > 1e-6);

        let layer = topo.slice_at(15.0);
        assert_eq!(layer.contours[0].len(), 5);
        assert!((layer.contours[0].area() - 2500.0).abs() < 1e-6);
    }

    #[test]
    fn test_matches_sweep_perimeter() {
        let mesh = cube();
        let heights = layer_heights(0.0, 30.0, 0.7);
        let topo = TopoSlicer::new(&mesh.triangles).slice(&heights);
        let sweep = slice_sweep(&mesh.triangles, &heights);
        for (t, s) in topo.iter().zip(&sweep) {
            let walked: f64 = t.contours.iter().map(Polyline::length).sum();
            let raw: f64 = s.segments.iter().map(Segment::length).sum();
            assert!((walked - raw).abs() < 1e-6);
        }
    }

    #[test]
    fn test_open_mesh_gives_open_contour() {
        // Drop one side of the cube; the walk cannot close.
        let mut mesh = cube();
        mesh.triangles.drain(4..6);
        let layer = TopoSlicer::new(&mesh.triangles).slice_at(15.0);
        assert!(layer.contours.is_empty());
        assert_eq!(layer.open_contours.len(), 1);
        // Three remaining sides, 150mm of wall.
        assert!((layer.open_contours[0].length() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertex_on_plane() {
        // Square pyramid sliced through the apex height and through the base corners.
        let apex = Point3::new(5.0, 5.0, 10.0);
        let base = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let mut tris = Vec::new();
        for i in 0..4 {
            tris.push(Triangle::from_vertices(base[i], base[(i + 1) % 4], apex));
        }
        tris.push(Triangle::from_vertices(base[0], base[2], base[1]));
        tris.push(Triangle::from_vertices(base[0], base[3], base[2]));
        let topo = TopoSlicer::new(&tris);
        let mid = topo.slice_at(5.0);
        assert_eq!(mid.contours.len(), 1);
        assert!((mid.contours[0].area() - 25.0).abs() < 1e-9);
        // The apex only touches the plane.
        assert!(topo.slice_at(10.0).contours.is_empty());
    }
}
