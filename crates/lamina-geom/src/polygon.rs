//! Polygon predicates, triangle slicing and orientation fix-up.

use lamina_math::{Point3, Transform};

use crate::query::{intersect_segment_plane, point_segment_distance};
use crate::{Plane, Polyline, Segment, Triangle, EPSILON, EPSILON_SQ};

/// Where a point lies relative to a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Containment {
    /// Strictly outside.
    Outside,
    /// Strictly inside.
    Inside,
    /// Within [`EPSILON`] of an edge.
    OnBoundary,
}

/// A point-in-polygon test, passed explicitly to the stages that need one.
pub type ContainmentFn = fn(&Point3, &Polyline) -> Containment;

/// Locate `p` relative to `polygon` in the XY plane.
///
/// Boundary hits are detected first; otherwise a horizontal ray is cast
/// toward +X and crossings are counted with the half-open rule, so a
/// vertex lying exactly on the ray is counted once.
pub fn point_in_polygon(p: &Point3, polygon: &Polyline) -> Containment {
    let pts = &polygon.points;
    let n = pts.len();
    if n == 0 {
        return Containment::Outside;
    }
    let flat = |q: &Point3| Point3::new(q.x, q.y, 0.0);
    let pf = flat(p);
    for i in 0..n {
        let seg = Segment::new(flat(&pts[i]), flat(&pts[(i + 1) % n]));
        if point_segment_distance(&pf, &seg) < EPSILON {
            return Containment::OnBoundary;
        }
    }

    let mut inside = false;
    for i in 0..n {
        let a = &pts[i];
        let b = &pts[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x > p.x {
                inside = !inside;
            }
        }
    }
    if inside {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Intersection of a triangle with a plane as a segment.
///
/// A single touching vertex, a miss and degenerate (zero-length) results
/// all yield `None`.
pub fn intersect_triangle_plane(tri: &Triangle, plane: &Plane) -> Option<Segment> {
    let c1 = intersect_segment_plane(&Segment::new(tri.a, tri.b), plane);
    let c2 = intersect_segment_plane(&Segment::new(tri.a, tri.c), plane);
    let c3 = intersect_segment_plane(&Segment::new(tri.b, tri.c), plane);

    let seg = match (c1, c2, c3) {
        (None, Some(p), Some(q)) | (Some(p), None, Some(q)) | (Some(p), Some(q), None) => {
            Segment::new(p, q)
        }
        // A vertex on the plane: two of the crossings coincide.
        (Some(p), Some(q), Some(r)) => {
            if (p - q).norm_squared() < EPSILON_SQ {
                Segment::new(p, r)
            } else {
                Segment::new(p, q)
            }
        }
        _ => return None,
    };
    (seg.length_sq() >= EPSILON_SQ).then_some(seg)
}

/// Intersection of a triangle with the horizontal plane at `z`.
pub fn intersect_triangle_z(tri: &Triangle, z: f64) -> Option<Segment> {
    if tri.z_min() > z || tri.z_max() < z {
        return None;
    }
    intersect_triangle_plane(tri, &Plane::z_plane(z))
}

/// Orient contours by nesting parity: a contour whose start point lies
/// inside an even number of the others becomes counter-clockwise, an odd
/// one clockwise.
pub fn adjust_polygon_dirs(polygons: &mut [Polyline]) {
    adjust_polygon_dirs_with(polygons, point_in_polygon);
}

/// [`adjust_polygon_dirs`] with an explicit point-in-polygon test.
pub fn adjust_polygon_dirs_with(polygons: &mut [Polyline], locate: ContainmentFn) {
    let parity: Vec<bool> = (0..polygons.len())
        .map(|i| {
            let Some(start) = polygons[i].start().copied() else {
                return false;
            };
            let count = polygons
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && locate(&start, other) == Containment::Inside)
                .count();
            count % 2 == 1
        })
        .collect();
    for (poly, odd) in polygons.iter_mut().zip(parity) {
        if odd {
            poly.make_cw();
        } else {
            poly.make_ccw();
        }
    }
}

/// Rotate polygons about the Z axis through `center` (the origin when
/// `None`), returning new polygons.
pub fn rotate_polygons(polygons: &[Polyline], angle: f64, center: Option<Point3>) -> Vec<Polyline> {
    let c = center.unwrap_or_else(Point3::origin);
    let t = Transform::translation(c.x, c.y, 0.0)
        .then(&Transform::rotation_z(angle))
        .then(&Transform::translation(-c.x, -c.y, 0.0));
    polygons.iter().map(|p| p.transformed(&t)).collect()
}

/// Combined signed area of a set of contours.
pub fn total_area(polygons: &[Polyline]) -> f64 {
    polygons.iter().map(Polyline::signed_area).sum()
}
