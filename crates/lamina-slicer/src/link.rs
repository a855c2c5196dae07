//! Segment linking: unordered plane crossings into contours.
//!
//! Every strategy follows the same contract. Chains that return to their
//! start become closed contours; chains that do not are reported in
//! [`LinkResult::open`] and are never dropped. Closed contours lose their
//! collinear vertices before they are returned.
//!
//! - [`link_dlook`] hashes endpoints rounded to [`Tolerance::key_digits`]
//!   decimals. Linear on average; the default.
//! - [`link_dorder`] sorts endpoints lexicographically and scans neighbours
//!   within [`Tolerance::link_sort`]. No hashing, `O(n log n)`.
//! - [`link_brute`] grows one chain at both ends with a quadratic scan.
//!   Reference for small inputs.

use std::collections::HashMap;

use lamina_geom::{adjust_polygon_dirs, Polyline, Segment};
use lamina_math::{Point3, Tolerance};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::clip::clean_contours;
use crate::layer::Layer;
use crate::settings::LinkStrategy;

/// Contours produced by one linking call.
#[derive(Debug, Clone, Default)]
pub struct LinkResult {
    /// Closed contours with at least three distinct points.
    pub closed: Vec<Polyline>,
    /// Chains that never closed.
    pub open: Vec<Polyline>,
}

impl LinkResult {
    /// Force-close open chains with more than two points whose end lies
    /// within `max_gap` of their start. Healed contours are simplified like
    /// linked ones. Returns the number closed.
    pub fn heal(&mut self, max_gap: f64, tol: &Tolerance) -> usize {
        let (healable, rest): (Vec<Polyline>, Vec<Polyline>) =
            std::mem::take(&mut self.open).into_iter().partition(|c| {
                match (c.start(), c.end()) {
                    (Some(a), Some(b)) => c.len() > 2 && (a - b).norm() <= max_gap,
                    _ => false,
                }
            });
        self.open = rest;
        let healed = healable.len();
        for mut c in healable {
            c.close();
            self.push_chain(c, true, tol);
        }
        healed
    }

    fn push_chain(&mut self, mut chain: Polyline, closed: bool, tol: &Tolerance) {
        if closed && chain.len() >= 4 {
            chain.simplify_collinear(tol.epsilon);
            self.closed.push(chain);
        } else if !chain.is_empty() {
            self.open.push(chain);
        }
    }
}

/// Counts gathered while linking a stack of layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Closed contours, healed ones included.
    pub closed: usize,
    /// Chains left open.
    pub open: usize,
    /// Chains force-closed by healing.
    pub healed: usize,
}

impl std::ops::Add for LinkReport {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        Self {
            closed: self.closed + o.closed,
            open: self.open + o.open,
            healed: self.healed + o.healed,
        }
    }
}

/// Link segments with the chosen strategy.
pub fn link_segments(segments: &[Segment], strategy: LinkStrategy, tol: &Tolerance) -> LinkResult {
    match strategy {
        LinkStrategy::DictionaryLookup => link_dlook(segments, tol),
        LinkStrategy::DictionarySort => link_dorder(segments, tol),
        LinkStrategy::BruteForce => link_brute(segments, tol),
    }
}

/// Endpoint table shared by the dictionary strategies. Segment `i` owns
/// points `2i` and `2i + 1`, so a point's partner is `i ^ 1`.
struct Endpoints {
    points: Vec<Point3>,
    near: Vec<Vec<usize>>,
    used: Vec<bool>,
}

impl Endpoints {
    fn new(segments: &[Segment]) -> Self {
        let points: Vec<Point3> = segments.iter().flat_map(|s| [s.a, s.b]).collect();
        let n = points.len();
        Self {
            points,
            near: vec![Vec::new(); n],
            used: vec![false; n],
        }
    }

    fn take(&mut self, i: usize) {
        self.used[i] = true;
        self.used[i ^ 1] = true;
    }

    fn next_free(&self, at: usize) -> Option<usize> {
        self.near[at].iter().copied().find(|&j| !self.used[j])
    }

    /// Chain every segment, starting each chain at the first free point.
    fn chain_all(mut self, tol: &Tolerance, same: impl Fn(usize, usize) -> bool) -> LinkResult {
        let mut result = LinkResult::default();
        let limit = 2 * self.points.len();
        for seed in (0..self.points.len()).step_by(2) {
            if self.used[seed] {
                continue;
            }
            self.take(seed);
            let mut forward = vec![self.points[seed], self.points[seed ^ 1]];
            let mut tail = seed ^ 1;
            let mut closed = false;
            let mut steps = 0;
            while steps < limit {
                steps += 1;
                if forward.len() >= 3 && same(tail, seed) {
                    closed = true;
                    break;
                }
                let Some(j) = self.next_free(tail) else {
                    break;
                };
                self.take(j);
                tail = j ^ 1;
                forward.push(self.points[tail]);
            }

            if closed {
                // Snap the closing point onto the seed.
                if let Some(last) = forward.last_mut() {
                    *last = self.points[seed];
                }
                result.push_chain(Polyline::from_points(forward), true, tol);
                continue;
            }

            let mut backward = Vec::new();
            let mut head = seed;
            while steps < limit {
                steps += 1;
                let Some(j) = self.next_free(head) else {
                    break;
                };
                self.take(j);
                head = j ^ 1;
                backward.push(self.points[head]);
            }
            backward.reverse();
            backward.extend(forward);
            result.push_chain(Polyline::from_points(backward), false, tol);
        }
        result
    }
}

/// Dictionary-lookup linking.
pub fn link_dlook(segments: &[Segment], tol: &Tolerance) -> LinkResult {
    let mut ends = Endpoints::new(segments);
    let keys: Vec<[i64; 3]> = ends.points.iter().map(|p| tol.point_key(p)).collect();
    let mut table: HashMap<[i64; 3], Vec<usize>> = HashMap::with_capacity(keys.len());
    for (i, k) in keys.iter().enumerate() {
        table.entry(*k).or_default().push(i);
    }
    for (i, k) in keys.iter().enumerate() {
        if let Some(bucket) = table.get(k) {
            ends.near[i] = bucket.iter().copied().filter(|&j| j != i).collect();
        }
    }
    ends.chain_all(tol, |a, b| keys[a] == keys[b])
}

/// Dictionary-sort linking.
pub fn link_dorder(segments: &[Segment], tol: &Tolerance) -> LinkResult {
    let mut ends = Endpoints::new(segments);
    let pts = &ends.points;
    let mut order: Vec<usize> = (0..pts.len()).collect();
    order.sort_by(|&a, &b| {
        pts[a]
            .x
            .total_cmp(&pts[b].x)
            .then(pts[a].y.total_cmp(&pts[b].y))
            .then(pts[a].z.total_cmp(&pts[b].z))
    });
    let d = tol.link_sort;
    let mut near = vec![Vec::new(); pts.len()];
    for (a, &i) in order.iter().enumerate() {
        for &j in &order[a + 1..] {
            if pts[j].x - pts[i].x > d {
                break;
            }
            if (pts[j] - pts[i]).norm() <= d {
                near[i].push(j);
                near[j].push(i);
            }
        }
    }
    ends.near = near;
    let points = ends.points.clone();
    ends.chain_all(tol, move |a, b| (points[a] - points[b]).norm() <= d)
}

/// Brute-force linking.
pub fn link_brute(segments: &[Segment], tol: &Tolerance) -> LinkResult {
    let mut remaining: Vec<Segment> = segments.to_vec();
    remaining.reverse();
    let mut result = LinkResult::default();
    let same = |a: &Point3, b: &Point3| tol.points_equal(a, b);

    while let Some(first) = remaining.pop() {
        let mut chain = vec![first.a, first.b];
        let mut closed = false;
        loop {
            let (head, tail) = (chain[0], chain[chain.len() - 1]);
            if chain.len() >= 3 && same(&head, &tail) {
                closed = true;
                break;
            }
            let Some(i) = remaining
                .iter()
                .position(|s| same(&tail, &s.a) || same(&tail, &s.b) || same(&head, &s.a) || same(&head, &s.b))
            else {
                break;
            };
            let s = remaining.remove(i);
            if same(&tail, &s.a) {
                chain.push(s.b);
            } else if same(&tail, &s.b) {
                chain.push(s.a);
            } else if same(&head, &s.b) {
                chain.insert(0, s.a);
            } else {
                chain.insert(0, s.b);
            }
        }
        if closed {
            let first = chain[0];
            let last = chain.len() - 1;
            chain[last] = first;
        }
        result.push_chain(Polyline::from_points(chain), closed, tol);
    }
    result
}

/// Link one layer's segments into contours in place.
///
/// Open chains already on the layer (from a topological walk) take part in
/// healing. Closed contours are oriented by nesting parity.
pub fn link_layer(layer: &mut Layer, strategy: LinkStrategy, heal: bool, tol: &Tolerance) -> LinkReport {
    let segments = std::mem::take(&mut layer.segments);
    let mut result = if segments.is_empty() {
        LinkResult::default()
    } else {
        link_segments(&segments, strategy, tol)
    };
    result.open.append(&mut layer.open_contours);
    let healed = if heal { result.heal(tol.heal_gap, tol) } else { 0 };

    layer.contours.append(&mut result.closed);
    adjust_polygon_dirs(&mut layer.contours);
    layer.open_contours = result.open;
    if !layer.open_contours.is_empty() {
        debug!(z = layer.z, open = layer.open_contours.len(), "Open contours after linking");
    }
    LinkReport {
        closed: layer.contours.len(),
        open: layer.open_contours.len(),
        healed,
    }
}

/// Link every layer in parallel.
pub fn link_layers(layers: &mut [Layer], strategy: LinkStrategy, heal: bool, tol: &Tolerance) -> LinkReport {
    let report = layers
        .par_iter_mut()
        .map(|layer| link_layer(layer, strategy, heal, tol))
        .reduce(LinkReport::default, |a, b| a + b);
    if report.healed > 0 {
        warn!(healed = report.healed, "Force-closed open contours");
    }
    if report.open > 0 {
        warn!(open = report.open, "Contours left open after linking");
    }
    info!(closed = report.closed, ?strategy, "Linked contours");
    report
}

/// Clean every layer's closed contours with an out-and-back offset of
/// `precision`, then re-orient them.
pub fn clean_layers(layers: &mut [Layer], precision: f64) {
    if precision <= 0.0 {
        return;
    }
    layers.par_iter_mut().for_each(|layer| {
        if layer.contours.is_empty() {
            return;
        }
        layer.contours = clean_contours(&layer.contours, precision);
        adjust_polygon_dirs(&mut layer.contours);
    });
    debug!(precision, "Cleaned contours");
}
