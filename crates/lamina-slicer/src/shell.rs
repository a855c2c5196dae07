//! Contour-parallel shell paths.
//!
//! The region is shrunk repeatedly: first by half the line spacing, then
//! by one more spacing per ring until the shell thickness is passed or the
//! region is used up. Rings are then spliced into the ring enclosing them,
//! innermost first, with travel moves across each splice.

use lamina_geom::Polyline;

use crate::clip::{offset, Join};
use crate::nesting::NestingForest;

/// A child whose start is farther than this many spacings from every
/// parent vertex stays a separate path.
pub const ISLAND_FACTOR: f64 = 3.0;

/// Ring polygons smaller than this (mm²) are offset noise.
pub const MIN_RING_AREA: f64 = 1e-3;

fn inset(boundaries: &[Polyline], delta: f64) -> Vec<Polyline> {
    let mut ring = offset(boundaries, -delta, Join::Square);
    ring.retain(|p| p.area() >= MIN_RING_AREA);
    ring
}

/// Concentric inward offsets of `boundaries`, one entry per ring level.
pub fn offset_rings(boundaries: &[Polyline], interval: f64, shell_thickness: f64) -> Vec<Vec<Polyline>> {
    let mut rings = Vec::new();
    if boundaries.is_empty() || interval <= 0.0 {
        return rings;
    }
    let mut delta = interval / 2.0;
    let first = inset(boundaries, delta);
    if !first.is_empty() {
        rings.push(first);
    }
    while delta.abs() < shell_thickness {
        delta += interval;
        let next = inset(boundaries, delta);
        if next.is_empty() {
            break;
        }
        rings.push(next);
    }
    rings
}

/// Shell paths for one layer's boundaries.
pub fn gen_cp_path(boundaries: &[Polyline], interval: f64, shell_thickness: f64) -> Vec<Polyline> {
    let rings: Vec<Polyline> = offset_rings(boundaries, interval, shell_thickness)
        .into_iter()
        .flatten()
        .collect();
    link_rings(rings, interval)
}

/// Splice each ring into its enclosing ring, deepest first.
///
/// Rings that have no parent, or whose parent is too far away, come back
/// as their own paths in input order.
pub fn link_rings(mut rings: Vec<Polyline>, interval: f64) -> Vec<Polyline> {
    let forest = NestingForest::build(&rings);
    let reach_sq = (ISLAND_FACTOR * interval).powi(2);
    let mut absorbed = vec![false; rings.len()];

    for child in forest.deepest_first() {
        let Some(parent) = forest.nodes[child].parent else {
            continue;
        };
        let Some(start) = rings[child].start().copied() else {
            continue;
        };
        let nearest = rings[parent]
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p - start).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((at, d_sq)) = nearest else {
            continue;
        };
        if d_sq > reach_sq {
            continue;
        }
        let merged = splice(&rings[parent], &rings[child], at);
        rings[parent] = merged;
        absorbed[child] = true;
    }

    rings
        .into_iter()
        .zip(absorbed)
        .filter(|(_, gone)| !gone)
        .map(|(ring, _)| ring)
        .collect()
}

/// `parent[..=at]`, travel, `child`, travel, `parent[at..]`.
fn splice(parent: &Polyline, child: &Polyline, at: usize) -> Polyline {
    let mut out = Polyline::new();
    for i in 0..=at {
        out.push_tagged(parent.points[i], parent.is_travel(i));
    }
    out.mark_last_travel();
    for (i, p) in child.points.iter().enumerate() {
        out.push_tagged(*p, child.is_travel(i));
    }
    out.mark_last_travel();
    for i in at..parent.len() {
        out.push_tagged(parent.points[i], parent.is_travel(i));
    }
    out
}
