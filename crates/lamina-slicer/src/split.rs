//! Splitting regions into pieces that zig-zag hatching can cover without
//! crossing a hole or a notch.
//!
//! A turn point is a concave vertex where the boundary reverses its Y
//! direction. Each one is connected horizontally to the nearest boundary
//! crossings on its left and right, and a thin rectangle along that cut is
//! subtracted from the region.

use lamina_geom::Polyline;
use lamina_math::{Point3, Tolerance};
use tracing::warn;

use crate::clip::{clip, union_all, ClipOp, Fill};
use crate::hatch::hatch_points;

/// Concave vertices where the boundary turns back in Y.
///
/// Contours must be oriented, outer boundaries counter-clockwise.
pub fn turn_points(polys: &[Polyline]) -> Vec<Point3> {
    let mut out = Vec::new();
    for poly in polys {
        let n = if poly.is_closed() { poly.len() - 1 } else { poly.len() };
        if n < 3 {
            continue;
        }
        let ring = &poly.points[..n];
        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let v1 = cur - prev;
            let v2 = next - cur;
            let reverses = v1.y * v2.y <= 0.0;
            let concave = v1.x * v2.y - v1.y * v2.x < 0.0;
            if reverses && concave {
                out.push(cur);
            }
        }
    }
    out
}

/// Nearest crossings strictly left and right of `pt` in a sorted row.
fn left_right(row: &[Point3], pt: &Point3, eps: f64) -> Option<(Point3, Point3)> {
    let left = row.iter().rev().find(|p| p.x < pt.x - eps)?;
    let right = row.iter().find(|p| p.x > pt.x + eps)?;
    Some((*left, *right))
}

/// Thin rectangle around the horizontal cut from `l` to `r`.
fn splitter(l: &Point3, r: &Point3, d: f64) -> Polyline {
    Polyline::rectangle(l.x - d, l.y - d, r.x + d, r.y + d, l.z)
}

/// Cut rectangles for every turn point that has crossings on both sides.
pub fn splitters(polys: &[Polyline], tol: &Tolerance) -> Vec<Polyline> {
    let turns = turn_points(polys);
    let mut ys: Vec<f64> = turns.iter().map(|p| p.y).collect();
    ys.sort_by(f64::total_cmp);
    ys.dedup_by(|a, b| (*a - *b).abs() < tol.epsilon);
    let rows = hatch_points(polys, &ys, tol);

    turns
        .iter()
        .filter_map(|pt| {
            let row = ys.iter().position(|y| (y - pt.y).abs() < tol.epsilon)?;
            let (l, r) = left_right(&rows[row], pt, tol.epsilon)?;
            Some(splitter(&l, &r, tol.split_half_width))
        })
        .collect()
}

/// Split a region at its turn points.
///
/// Returns the input unchanged when there is nothing to split or the
/// Boolean kernel fails.
pub fn split_region(polys: &[Polyline], tol: &Tolerance) -> Vec<Polyline> {
    let cuts = splitters(polys, tol);
    if cuts.is_empty() {
        return polys.to_vec();
    }
    let result = union_all(&cuts, Fill::NonZero)
        .and_then(|cuts| clip(polys, &cuts, ClipOp::Difference, Fill::EvenOdd, 0.0));
    match result {
        Ok(pieces) => pieces,
        Err(e) => {
            warn!(error = %e, "Region split failed, hatching unsplit region");
            polys.to_vec()
        }
    }
}
