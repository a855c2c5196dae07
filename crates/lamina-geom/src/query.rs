//! Distance and intersection between primitive pairs.
//!
//! The primitive kinds form a closed set, so both operations are a single
//! match over `(kind, kind)` pairs. Pairs are symmetric: `distance(a, b)`
//! and `distance(b, a)` resolve to the same table entry.

use lamina_math::{Point3, Vec3};

use crate::{Line, Plane, Ray, Segment, EPSILON, EPSILON_SQ};

/// One of the primitive kinds the query table understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// A point.
    Point(Point3),
    /// An infinite line.
    Line(Line),
    /// A half-line.
    Ray(Ray),
    /// A bounded segment.
    Segment(Segment),
    /// An infinite plane.
    Plane(Plane),
}

impl From<Point3> for Primitive {
    fn from(p: Point3) -> Self {
        Primitive::Point(p)
    }
}

impl From<Line> for Primitive {
    fn from(l: Line) -> Self {
        Primitive::Line(l)
    }
}

impl From<Ray> for Primitive {
    fn from(r: Ray) -> Self {
        Primitive::Ray(r)
    }
}

impl From<Segment> for Primitive {
    fn from(s: Segment) -> Self {
        Primitive::Segment(s)
    }
}

impl From<Plane> for Primitive {
    fn from(p: Plane) -> Self {
        Primitive::Plane(p)
    }
}

/// Result of intersecting two primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    /// A single point.
    Point(Point3),
    /// A line (two non-parallel planes).
    Line(Line),
}

impl Intersection {
    /// The intersection point, if the result is a point.
    pub fn point(&self) -> Option<Point3> {
        match self {
            Intersection::Point(p) => Some(*p),
            Intersection::Line(_) => None,
        }
    }
}

/// Minimum distance between two primitives.
///
/// Returns `None` for pairs without a table entry (for example two
/// segments), which callers treat as "not supported".
pub fn distance(a: &Primitive, b: &Primitive) -> Option<f64> {
    use Primitive as P;
    match (a, b) {
        (P::Point(p), P::Point(q)) => Some((p - q).norm()),
        (P::Point(p), P::Line(l)) | (P::Line(l), P::Point(p)) => Some(point_line_distance(p, l)),
        (P::Point(p), P::Ray(r)) | (P::Ray(r), P::Point(p)) => Some(point_ray_distance(p, r)),
        (P::Point(p), P::Segment(s)) | (P::Segment(s), P::Point(p)) => {
            Some(point_segment_distance(p, s))
        }
        (P::Point(p), P::Plane(pl)) | (P::Plane(pl), P::Point(p)) => {
            Some(pl.signed_distance(p).abs())
        }
        (P::Line(l1), P::Line(l2)) => Some(line_line_distance(l1, l2)),
        (P::Line(l), P::Plane(pl)) | (P::Plane(pl), P::Line(l)) => {
            if l.dir.dot(&pl.normal).abs() < EPSILON {
                Some(pl.signed_distance(&l.origin).abs())
            } else {
                Some(0.0)
            }
        }
        (P::Ray(r), P::Plane(pl)) | (P::Plane(pl), P::Ray(r)) => {
            let d0 = pl.signed_distance(&r.origin);
            let rate = r.dir.dot(&pl.normal);
            // The ray reaches the plane when it heads toward it.
            if rate.abs() >= EPSILON && d0 * rate <= 0.0 {
                Some(0.0)
            } else {
                Some(d0.abs())
            }
        }
        (P::Segment(s), P::Plane(pl)) | (P::Plane(pl), P::Segment(s)) => {
            let fa = pl.signed_distance(&s.a);
            let fb = pl.signed_distance(&s.b);
            if fa * fb <= 0.0 {
                Some(0.0)
            } else {
                Some(fa.abs().min(fb.abs()))
            }
        }
        _ => None,
    }
}

/// Intersection of two primitives, or `None` when they do not meet or the
/// pair has no table entry.
pub fn intersect(a: &Primitive, b: &Primitive) -> Option<Intersection> {
    use Primitive as P;
    let point = |p: Option<Point3>| p.map(Intersection::Point);
    match (a, b) {
        (P::Line(l1), P::Line(l2)) => point(line_line_params(l1, l2).map(|(p, _, _)| p)),
        (P::Line(l), P::Ray(r)) | (P::Ray(r), P::Line(l)) => point(
            line_line_params(l, &r.line())
                .filter(|(_, _, t)| *t >= -EPSILON)
                .map(|(p, _, _)| p),
        ),
        (P::Line(l), P::Segment(s)) | (P::Segment(s), P::Line(l)) => {
            let len = s.length();
            point(
                line_line_params(l, &Line::new(s.a, s.direction()))
                    .filter(|(_, _, t)| *t >= -EPSILON && *t <= len + EPSILON)
                    .map(|(p, _, _)| p),
            )
        }
        (P::Ray(r1), P::Ray(r2)) => point(
            line_line_params(&r1.line(), &r2.line())
                .filter(|(_, t1, t2)| *t1 >= -EPSILON && *t2 >= -EPSILON)
                .map(|(p, _, _)| p),
        ),
        (P::Ray(r), P::Segment(s)) | (P::Segment(s), P::Ray(r)) => {
            let len = s.length();
            point(
                line_line_params(&r.line(), &Line::new(s.a, s.direction()))
                    .filter(|(_, t1, t2)| *t1 >= -EPSILON && *t2 >= -EPSILON && *t2 <= len + EPSILON)
                    .map(|(p, _, _)| p),
            )
        }
        (P::Segment(s1), P::Segment(s2)) => {
            let (l1, l2) = (s1.length(), s2.length());
            point(
                line_line_params(&Line::new(s1.a, s1.direction()), &Line::new(s2.a, s2.direction()))
                    .filter(|(_, t1, t2)| {
                        *t1 >= -EPSILON && *t1 <= l1 + EPSILON && *t2 >= -EPSILON && *t2 <= l2 + EPSILON
                    })
                    .map(|(p, _, _)| p),
            )
        }
        (P::Line(l), P::Plane(pl)) | (P::Plane(pl), P::Line(l)) => point(line_plane(l, pl)),
        (P::Ray(r), P::Plane(pl)) | (P::Plane(pl), P::Ray(r)) => {
            point(line_plane(&r.line(), pl).filter(|p| point_on_ray(p, r)))
        }
        (P::Segment(s), P::Plane(pl)) | (P::Plane(pl), P::Segment(s)) => {
            point(intersect_segment_plane(s, pl))
        }
        (P::Plane(p1), P::Plane(p2)) => plane_plane(p1, p2).map(Intersection::Line),
        _ => None,
    }
}

/// Distance from `p` to an infinite line.
pub fn point_line_distance(p: &Point3, l: &Line) -> f64 {
    let t = (p - l.origin).dot(&l.dir);
    (p - l.at(t)).norm()
}

/// Distance from `p` to a ray.
pub fn point_ray_distance(p: &Point3, r: &Ray) -> f64 {
    let t = (p - r.origin).dot(&r.dir);
    if t >= 0.0 {
        (p - (r.origin + r.dir * t)).norm()
    } else {
        (p - r.origin).norm()
    }
}

/// Distance from `p` to a segment.
pub fn point_segment_distance(p: &Point3, s: &Segment) -> f64 {
    let ab = s.direction();
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON_SQ {
        return (p - s.a).norm();
    }
    let t = ((p - s.a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (s.a + ab * t)).norm()
}

fn line_line_distance(l1: &Line, l2: &Line) -> f64 {
    let n = l1.dir.cross(&l2.dir);
    if n.norm_squared() < EPSILON_SQ {
        return point_line_distance(&l1.origin, l2);
    }
    (l2.origin - l1.origin).dot(&n).abs() / n.norm()
}

/// Intersection point of two lines with the parameters along each.
///
/// Parallel coincident lines report the first line's origin.
fn line_line_params(l1: &Line, l2: &Line) -> Option<(Point3, f64, f64)> {
    let w = l2.origin - l1.origin;
    let n = l1.dir.cross(&l2.dir);
    let nn = n.norm_squared();
    if nn < EPSILON_SQ {
        if w.cross(&l2.dir).norm_squared() < EPSILON_SQ {
            return Some((l1.origin, 0.0, -w.dot(&l2.dir)));
        }
        return None;
    }
    let t1 = w.cross(&l2.dir).dot(&n) / nn;
    let t2 = w.cross(&l1.dir).dot(&n) / nn;
    let p1 = l1.at(t1);
    let p2 = l2.at(t2);
    // Skew lines do not meet.
    if (p1 - p2).norm_squared() > EPSILON_SQ {
        return None;
    }
    Some((p1, t1, t2))
}

fn line_plane(l: &Line, pl: &Plane) -> Option<Point3> {
    let dot = l.dir.dot(&pl.normal);
    if dot.abs() < EPSILON {
        return pl.contains(&l.origin).then_some(l.origin);
    }
    let t = -pl.signed_distance(&l.origin) / dot;
    Some(l.at(t))
}

fn plane_plane(p1: &Plane, p2: &Plane) -> Option<Line> {
    let dir = p1.normal.cross(&p2.normal);
    let dd = dir.norm_squared();
    if dd < EPSILON_SQ {
        return None;
    }
    let d1 = p1.normal.dot(&p1.origin.coords);
    let d2 = p2.normal.dot(&p2.origin.coords);
    let origin = (p2.normal.cross(&dir) * d1 + dir.cross(&p1.normal) * d2) / dd;
    Some(Line::new(Point3::from(origin), dir))
}

/// Whether `p` lies on the ray (its origin included).
pub fn point_on_ray(p: &Point3, r: &Ray) -> bool {
    let v: Vec3 = p - r.origin;
    if v.norm_squared() < EPSILON_SQ {
        return true;
    }
    r.dir.cross(&v).norm_squared() < EPSILON_SQ && r.dir.dot(&v) > 0.0
}

/// Whether `p` lies on the segment within [`EPSILON`].
pub fn point_on_segment(p: &Point3, s: &Segment) -> bool {
    point_segment_distance(p, s) < EPSILON
}

/// Intersection of a segment with a plane.
///
/// A segment lying in the plane reports its first endpoint; a degenerate
/// segment reports its point only if it is on the plane.
pub fn intersect_segment_plane(s: &Segment, pl: &Plane) -> Option<Point3> {
    let ab = s.direction();
    if ab.norm_squared() < EPSILON_SQ {
        return pl.contains(&s.a).then_some(s.a);
    }
    let dot = ab.dot(&pl.normal);
    if dot.abs() < EPSILON {
        return pl.contains(&s.a).then_some(s.a);
    }
    let t = -pl.signed_distance(&s.a) / dot;
    (0.0..=1.0).contains(&t).then(|| s.a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_point_distances() {
        let q = Primitive::Point(p(0.0, 2.0, 0.0));
        let line = Primitive::Line(Line::new(p(0.0, 0.0, 0.0), Vec3::x()));
        let ray = Primitive::Ray(Ray::new(p(1.0, 0.0, 0.0), Vec3::x()));
        let seg = Primitive::Segment(Segment::new(p(1.0, 0.0, 0.0), p(3.0, 0.0, 0.0)));
        assert_relative_eq!(distance(&q, &line).unwrap(), 2.0);
        assert_relative_eq!(distance(&q, &ray).unwrap(), 5f64.sqrt());
        assert_relative_eq!(distance(&seg, &q).unwrap(), 5f64.sqrt());
        let plane = Primitive::Plane(Plane::z_plane(-3.0));
        assert_relative_eq!(distance(&q, &plane).unwrap(), 3.0);
    }

    #[test]
    fn test_skew_line_distance() {
        let a = Primitive::Line(Line::new(p(0.0, 0.0, 0.0), Vec3::x()));
        let b = Primitive::Line(Line::new(p(0.0, 0.0, 4.0), Vec3::y()));
        assert_relative_eq!(distance(&a, &b).unwrap(), 4.0);
        assert!(intersect(&a, &b).is_none());
    }

    #[test]
    fn test_segment_segment_intersection() {
        let a = Primitive::Segment(Segment::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 0.0)));
        let b = Primitive::Segment(Segment::new(p(0.0, 2.0, 0.0), p(2.0, 0.0, 0.0)));
        let hit = intersect(&a, &b).and_then(|i| i.point()).unwrap();
        assert_relative_eq!(hit.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(hit.y, 1.0, epsilon = 1e-12);

        let c = Primitive::Segment(Segment::new(p(3.0, 0.0, 0.0), p(5.0, 2.0, 0.0)));
        assert!(intersect(&b, &c).is_none());
    }

    #[test]
    fn test_ray_plane_direction_matters() {
        let plane = Primitive::Plane(Plane::z_plane(5.0));
        let up = Primitive::Ray(Ray::new(p(0.0, 0.0, 0.0), Vec3::z()));
        let down = Primitive::Ray(Ray::new(p(0.0, 0.0, 0.0), -Vec3::z()));
        let hit = intersect(&up, &plane).and_then(|i| i.point()).unwrap();
        assert_relative_eq!(hit.z, 5.0);
        assert!(intersect(&down, &plane).is_none());
        assert_relative_eq!(distance(&down, &plane).unwrap(), 5.0);
        assert_relative_eq!(distance(&up, &plane).unwrap(), 0.0);
    }

    #[test]
    fn test_plane_plane_line() {
        let a = Primitive::Plane(Plane::z_plane(2.0));
        let b = Primitive::Plane(Plane::new(p(3.0, 0.0, 0.0), Vec3::x()));
        match intersect(&a, &b) {
            Some(Intersection::Line(l)) => {
                assert_relative_eq!(l.origin.x, 3.0, epsilon = 1e-12);
                assert_relative_eq!(l.origin.z, 2.0, epsilon = 1e-12);
                assert_relative_eq!(l.dir.y.abs(), 1.0, epsilon = 1e-12);
            }
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_pair() {
        let a = Primitive::Segment(Segment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)));
        let b = Primitive::Segment(Segment::new(p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0)));
        assert!(distance(&a, &b).is_none());
    }

    #[test]
    fn test_segment_plane_endpoint_on_plane() {
        let s = Segment::new(p(0.0, 0.0, 1.0), p(0.0, 0.0, 3.0));
        let hit = intersect_segment_plane(&s, &Plane::z_plane(1.0)).unwrap();
        assert_eq!(hit, s.a);
        assert!(intersect_segment_plane(&s, &Plane::z_plane(3.5)).is_none());
    }
}
