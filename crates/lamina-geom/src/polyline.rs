//! Ordered point sequences: contours, rings and tool paths.

use lamina_math::{Point3, Transform, Vec3};

use crate::{Segment, EPSILON_SQ};

/// An ordered sequence of owned points, open or closed.
///
/// A closed polyline repeats its first point at the end. Each point may
/// carry a travel tag: when point `i` is tagged, the move from `i` to
/// `i + 1` is a non-extruding travel move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    /// Points in order.
    pub points: Vec<Point3>,
    travel: Vec<bool>,
}

impl Polyline {
    /// Create an empty polyline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an untagged polyline from points.
    pub fn from_points(points: Vec<Point3>) -> Self {
        let travel = vec![false; points.len()];
        Self { points, travel }
    }

    /// Create a closed polyline from the corners of a polygon.
    pub fn closed_from(mut points: Vec<Point3>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last()) {
            if (first - last).norm_squared() >= EPSILON_SQ {
                points.push(first);
            }
        }
        Self::from_points(points)
    }

    /// Axis-aligned rectangle at height `z`, counter-clockwise and closed.
    pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64, z: f64) -> Self {
        Self::closed_from(vec![
            Point3::new(x0, y0, z),
            Point3::new(x1, y0, z),
            Point3::new(x1, y1, z),
            Point3::new(x0, y1, z),
        ])
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append an untagged point.
    pub fn push(&mut self, p: Point3) {
        self.push_tagged(p, false);
    }

    /// Append a point with an explicit travel tag.
    pub fn push_tagged(&mut self, p: Point3, travel: bool) {
        self.travel.resize(self.points.len(), false);
        self.points.push(p);
        self.travel.push(travel);
    }

    /// Prepend an untagged point.
    pub fn push_front(&mut self, p: Point3) {
        self.travel.resize(self.points.len(), false);
        self.points.insert(0, p);
        self.travel.insert(0, false);
    }

    /// Append a segment, starting with its first endpoint if empty.
    pub fn append_segment(&mut self, seg: &Segment) {
        if self.points.is_empty() {
            self.push(seg.a);
        }
        self.push(seg.b);
    }

    /// Point at `i`.
    pub fn point(&self, i: usize) -> Option<&Point3> {
        self.points.get(i)
    }

    /// First point.
    pub fn start(&self) -> Option<&Point3> {
        self.points.first()
    }

    /// Last point.
    pub fn end(&self) -> Option<&Point3> {
        self.points.last()
    }

    /// Whether the move leaving point `i` is a travel move.
    pub fn is_travel(&self, i: usize) -> bool {
        self.travel.get(i).copied().unwrap_or(false)
    }

    /// Tag or untag the move leaving point `i`.
    pub fn set_travel(&mut self, i: usize, travel: bool) {
        if i < self.points.len() {
            self.travel.resize(self.points.len(), false);
            self.travel[i] = travel;
        }
    }

    /// Tag the move leaving the last point.
    pub fn mark_last_travel(&mut self) {
        if let Some(last) = self.points.len().checked_sub(1) {
            self.set_travel(last, true);
        }
    }

    /// Number of travel-tagged points.
    pub fn travel_count(&self) -> usize {
        self.travel.iter().filter(|t| **t).count()
    }

    /// At least three points and the last coincides with the first.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) if self.points.len() >= 3 => (a - b).norm_squared() < EPSILON_SQ,
            _ => false,
        }
    }

    /// Close the polyline by repeating its first point.
    pub fn close(&mut self) {
        if let Some(first) = self.points.first().copied() {
            if !self.is_closed() {
                self.push(first);
            }
        }
    }

    /// Reverse the point order, keeping each travel tag on the same move.
    pub fn reverse(&mut self) {
        let n = self.points.len();
        self.points.reverse();
        let mut travel = vec![false; n];
        for i in 0..n.saturating_sub(1) {
            if self.is_travel(i) {
                travel[n - 2 - i] = true;
            }
        }
        self.travel = travel;
    }

    /// Shoelace area in the XY plane. Positive for counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Absolute enclosed area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Is the polyline counter-clockwise? Degenerate ones count as CCW.
    pub fn is_ccw(&self) -> bool {
        self.points.len() < 3 || self.signed_area() > 0.0
    }

    /// Ensure counter-clockwise winding.
    pub fn make_ccw(&mut self) {
        if !self.is_ccw() {
            self.reverse();
        }
    }

    /// Ensure clockwise winding.
    pub fn make_cw(&mut self) {
        if self.is_ccw() {
            self.reverse();
        }
    }

    /// Total length of all moves, travel included.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }

    /// Translate in place.
    pub fn translate(&mut self, v: &Vec3) {
        for p in &mut self.points {
            *p += v;
        }
    }

    /// Transform in place.
    pub fn transform(&mut self, t: &Transform) {
        for p in &mut self.points {
            *p = t.apply_point(p);
        }
    }

    /// A transformed copy.
    pub fn transformed(&self, t: &Transform) -> Self {
        let mut out = self.clone();
        out.transform(t);
        out
    }

    /// XY bounding box as `([x_min, y_min], [x_max, y_max])`.
    pub fn bounds_2d(&self) -> Option<([f64; 2], [f64; 2])> {
        let first = self.points.first()?;
        let mut min = [first.x, first.y];
        let mut max = min;
        for p in &self.points[1..] {
            min[0] = min[0].min(p.x);
            min[1] = min[1].min(p.y);
            max[0] = max[0].max(p.x);
            max[1] = max[1].max(p.y);
        }
        Some((min, max))
    }

    /// The segments between consecutive points.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    /// Drop vertices collinear with their neighbours on a closed polyline.
    ///
    /// The start point is kept only if it is a corner; the result stays closed.
    pub fn simplify_collinear(&mut self, eps: f64) {
        if !self.is_closed() {
            return;
        }
        let mut ring: Vec<Point3> = Vec::with_capacity(self.points.len());
        for p in &self.points[..self.points.len() - 1] {
            if ring.last().map_or(true, |q| (p - q).norm_squared() >= EPSILON_SQ) {
                ring.push(*p);
            }
        }
        while ring.len() > 1 && (ring[0] - ring[ring.len() - 1]).norm_squared() < EPSILON_SQ {
            ring.pop();
        }
        let n = ring.len();
        if n < 3 {
            return;
        }
        let corner = |i: usize| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            let p = ring[i];
            let e1 = p - prev;
            let e2 = next - p;
            let scale = e1.norm() * e2.norm();
            scale > 0.0 && (e1.x * e2.y - e1.y * e2.x).abs() > eps * scale
        };
        let kept: Vec<Point3> = (0..n).filter(|&i| corner(i)).map(|i| ring[i]).collect();
        if kept.len() >= 3 {
            *self = Self::closed_from(kept);
        }
    }
}

impl FromIterator<Point3> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point3>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polyline {
        Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)
    }

    #[test]
    fn test_rectangle_is_closed_ccw() {
        let sq = square();
        assert_eq!(sq.len(), 5);
        assert!(sq.is_closed());
        assert!(sq.is_ccw());
        assert!((sq.signed_area() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_make_cw_flips_sign() {
        let mut sq = square();
        sq.make_cw();
        assert!(!sq.is_ccw());
        assert!((sq.signed_area() + 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_reverse_keeps_travel_on_same_move() {
        let mut p = Polyline::from_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        // Move 1 -> 2 is travel.
        p.set_travel(1, true);
        p.reverse();
        // After reversal the same move is 2.0 -> 1.0, leaving index 1.
        assert!(p.is_travel(1));
        assert!(!p.is_travel(0));
        assert!(!p.is_travel(2));
        assert_eq!(p.points[1].x, 2.0);
        assert_eq!(p.points[2].x, 1.0);
    }

    #[test]
    fn test_tags_survive_clone_and_transform() {
        let mut p = square();
        p.set_travel(2, true);
        let q = p.transformed(&Transform::translation(1.0, 1.0, 0.0));
        assert!(q.is_travel(2));
        assert_eq!(q.travel_count(), 1);
    }

    #[test]
    fn test_simplify_collinear() {
        let mut p = Polyline::closed_from(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
        ]);
        p.simplify_collinear(1e-9);
        assert_eq!(p.len(), 5);
        assert!((p.area() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_simplify_collinear_repeated_points() {
        // Ring closed twice over, with a repeated corner in the middle.
        let mut p = Polyline::from_points(vec![
            Point3::new(50.0, 0.0, 0.0),
            Point3::new(25.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 25.0, 0.0),
            Point3::new(0.0, 50.0, 0.0),
            Point3::new(0.0, 50.0, 0.0),
            Point3::new(25.0, 50.0, 0.0),
            Point3::new(50.0, 50.0, 0.0),
            Point3::new(50.0, 25.0, 0.0),
            Point3::new(50.0, 0.0, 0.0),
            Point3::new(50.0, 0.0, 0.0),
        ]);
        p.simplify_collinear(1e-9);
        assert_eq!(p.len(), 5);
        assert!(p.is_closed());
        assert!((p.area() - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_polyline_not_closed() {
        let p = Polyline::from_points(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]);
        assert!(!p.is_closed());
        assert!((p.length() - 1.0).abs() < 1e-12);
    }
}
