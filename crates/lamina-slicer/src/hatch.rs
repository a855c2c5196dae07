//! Scan-line hatching of polygons.
//!
//! Scan lines run along X. Edges are sorted by their lowest Y and kept in
//! an active list while the scan line is inside their Y span; an edge is
//! active when `y_min < y <= y_max` (shifted by epsilon), so a vertex the
//! line passes through is counted once. Crossings that coincide pairwise
//! are touching vertices and are removed.

use lamina_geom::{Polyline, Segment};
use lamina_math::{Point3, Tolerance};

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: Point3,
    b: Point3,
    y_min: f64,
    y_max: f64,
}

impl Edge {
    fn crossing(&self, y: f64, eps: f64) -> Point3 {
        if (self.a.y - y).abs() < eps {
            return self.a;
        }
        if (self.b.y - y).abs() < eps {
            return self.b;
        }
        let t = (y - self.a.y) / (self.b.y - self.a.y);
        Point3::new(self.a.x + (self.b.x - self.a.x) * t, y, self.a.z)
    }
}

/// Scan heights on the global grid `k * interval`, covering the Y range of
/// `polys` within `tol.scan_margin`.
///
/// The grid starts from zero rather than from the polygons' own bounds so
/// that hatches on separate islands and layers line up.
pub fn scan_heights(polys: &[Polyline], interval: f64, tol: &Tolerance) -> Vec<f64> {
    let mut range: Option<(f64, f64)> = None;
    for p in polys.iter().flat_map(|poly| &poly.points) {
        range = Some(match range {
            Some((lo, hi)) => (lo.min(p.y), hi.max(p.y)),
            None => (p.y, p.y),
        });
    }
    let Some((y_min, y_max)) = range else {
        return Vec::new();
    };
    if interval <= 0.0 {
        return Vec::new();
    }
    let margin = tol.scan_margin;
    let first = ((y_min - margin) / interval).floor() as i64;
    (first..)
        .map(|k| k as f64 * interval)
        .take_while(|y| *y <= y_max + margin)
        .filter(|y| *y >= y_min - margin)
        .collect()
}

/// Crossings of every scan line in `ys` (ascending) with the polygon
/// edges, each row sorted by X.
pub fn hatch_points(polys: &[Polyline], ys: &[f64], tol: &Tolerance) -> Vec<Vec<Point3>> {
    let eps = tol.epsilon;
    let mut edges: Vec<Edge> = Vec::new();
    for poly in polys {
        let n = poly.len();
        for i in 0..n {
            let a = poly.points[i];
            let b = poly.points[(i + 1) % n];
            if (b - a).norm() < eps {
                continue;
            }
            edges.push(Edge {
                a,
                b,
                y_min: a.y.min(b.y),
                y_max: a.y.max(b.y),
            });
        }
    }
    edges.sort_by(|l, r| l.y_min.total_cmp(&r.y_min));

    let mut next = 0;
    let mut active: Vec<Edge> = Vec::new();
    let mut rows = Vec::with_capacity(ys.len());
    for &y in ys {
        let line = y - eps;
        active.retain(|e| e.y_max >= line);
        while next < edges.len() && edges[next].y_min < line {
            if edges[next].y_max >= line {
                active.push(edges[next]);
            }
            next += 1;
        }

        let mut row: Vec<Point3> = active.iter().map(|e| e.crossing(y, eps)).collect();
        row.sort_by(|l, r| l.x.total_cmp(&r.x));
        let mut i = row.len().saturating_sub(1);
        while i > 0 {
            if (row[i] - row[i - 1]).norm_squared() < tol.epsilon_sq {
                row.drain(i - 1..=i);
                if i < 2 {
                    break;
                }
                i -= 2;
            } else {
                i -= 1;
            }
        }
        rows.push(row);
    }
    rows
}

/// Hatch segments inside `polys` along the scan lines `ys`, pairing
/// crossings even-odd.
pub fn gen_hatches(polys: &[Polyline], ys: &[f64], tol: &Tolerance) -> Vec<Segment> {
    hatch_points(polys, ys, tol)
        .into_iter()
        .flat_map(|row| {
            row.chunks_exact(2)
                .map(|pair| Segment::new(pair[0], pair[1]))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Tolerance = Tolerance::DEFAULT;

    #[test]
    fn test_scan_heights_global_grid() {
        let a = vec![Polyline::rectangle(0.0, 10.0, 5.0, 20.0, 0.0)];
        assert_eq!(scan_heights(&a, 3.0, &TOL), vec![12.0, 15.0, 18.0]);
        let b = vec![Polyline::rectangle(0.0, 9.0, 5.0, 12.0, 0.0)];
        assert_eq!(scan_heights(&b, 3.0, &TOL), vec![9.0, 12.0]);
        assert!(scan_heights(&[], 3.0, &TOL).is_empty());
    }

    #[test]
    fn test_square_hatches() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 2.0)];
        let segs = gen_hatches(&sq, &[2.5, 5.0, 7.5], &TOL);
        assert_eq!(segs.len(), 3);
        for s in &segs {
            assert!((s.length() - 10.0).abs() < 1e-12);
            assert_eq!(s.a.z, 2.0);
            assert!(s.a.x < s.b.x);
        }
    }

    #[test]
    fn test_hole_gives_two_segments_per_row() {
        let mut hole = Polyline::rectangle(3.0, 3.0, 7.0, 7.0, 0.0);
        hole.make_cw();
        let polys = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0), hole];
        let rows = hatch_points(&polys, &[1.0, 5.0], &TOL);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[1].len(), 4);
        let segs = gen_hatches(&polys, &[5.0], &TOL);
        let total: f64 = segs.iter().map(Segment::length).sum();
        assert!((total - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertex_on_scan_line() {
        // Diamond: the line through the side vertices crosses once per side,
        // the line through the top vertex only touches.
        let diamond = vec![Polyline::closed_from(vec![
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(10.0, 5.0, 0.0),
            Point3::new(5.0, 10.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
        ])];
        let rows = hatch_points(&diamond, &[5.0, 10.0], &TOL);
        assert_eq!(rows[0].len(), 2);
        assert!((rows[0][0].x - 0.0).abs() < 1e-12);
        assert!((rows[0][1].x - 10.0).abs() < 1e-12);
        assert!(rows[1].is_empty());
    }
}
