//! Mesh slicing - intersect a triangle mesh with horizontal planes.
//!
//! Three strategies produce the same segment sets (up to order):
//!
//! - [`slice_sweep`] sorts triangles by their lowest vertex once and keeps
//!   an active set while the plane moves up.
//! - [`slice_match`] binary-searches each triangle's height range into a
//!   side table owned by the call.
//! - [`slice_naive`] tests every triangle against every height and exists
//!   to check the other two.

use lamina_geom::{intersect_triangle_z, Segment, Triangle};
use lamina_mesh::Mesh;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::layer::Layer;
use crate::settings::SlicingStrategy;
use crate::topo::TopoSlicer;

/// Heights strictly between `z_min` and `z_max`, starting at
/// `z_min + thickness` and stepping by `thickness`.
pub fn layer_heights(z_min: f64, z_max: f64, thickness: f64) -> Vec<f64> {
    if thickness <= 0.0 || !(z_max > z_min) {
        return Vec::new();
    }
    (1..)
        .map(|i| z_min + i as f64 * thickness)
        .take_while(|z| *z < z_max)
        .collect()
}

/// Slice `mesh` at `thickness` spacing with the chosen strategy.
///
/// Sweep and match layers carry raw segments; topological layers already
/// carry contours (closed ones in `contours`, broken walks in
/// `open_contours`). An empty mesh yields no layers.
pub fn slice_mesh(mesh: &Mesh, thickness: f64, strategy: SlicingStrategy) -> Vec<Layer> {
    let Some(bounds) = mesh.bounds() else {
        warn!("Mesh has no facets, nothing to slice");
        return Vec::new();
    };
    let heights = layer_heights(bounds.min.z, bounds.max.z, thickness);
    info!(
        facets = mesh.len(),
        layers = heights.len(),
        ?strategy,
        "Slicing mesh"
    );
    match strategy {
        SlicingStrategy::Sweep => slice_sweep(&mesh.triangles, &heights),
        SlicingStrategy::Match => slice_match(&mesh.triangles, &heights),
        SlicingStrategy::Topological => TopoSlicer::new(&mesh.triangles).slice(&heights),
    }
}

fn layer_from(z: f64, triangles: &[Triangle], ids: &[usize]) -> Layer {
    let segments: Vec<Segment> = ids
        .iter()
        .filter_map(|&t| intersect_triangle_z(&triangles[t], z))
        .collect();
    Layer::with_segments(z, segments)
}

/// Sweep-plane slicing. `heights` must be ascending.
pub fn slice_sweep(triangles: &[Triangle], heights: &[f64]) -> Vec<Layer> {
    let mut order: Vec<usize> = (0..triangles.len()).collect();
    order.sort_by(|&a, &b| triangles[a].z_min().total_cmp(&triangles[b].z_min()));

    // The active sets are gathered in one ordered pass; the crossings are
    // then computed per layer in parallel.
    let mut cursor = 0;
    let mut active: Vec<usize> = Vec::new();
    let mut batches: Vec<Vec<usize>> = Vec::with_capacity(heights.len());
    for &z in heights {
        active.retain(|&t| triangles[t].z_max() >= z);
        while cursor < order.len() && triangles[order[cursor]].z_min() <= z {
            let t = order[cursor];
            if triangles[t].z_max() >= z {
                active.push(t);
            }
            cursor += 1;
        }
        batches.push(active.clone());
    }

    let layers: Vec<Layer> = heights
        .par_iter()
        .zip(batches.par_iter())
        .map(|(&z, ids)| layer_from(z, triangles, ids))
        .collect();
    debug!(layers = layers.len(), "Sweep slicing done");
    layers
}

/// Layer-matching slicing. `heights` must be ascending.
pub fn slice_match(triangles: &[Triangle], heights: &[f64]) -> Vec<Layer> {
    // Side table: triangle index -> indices of the heights it spans.
    let table: Vec<Vec<usize>> = triangles
        .par_iter()
        .map(|tri| {
            let lo = heights.partition_point(|&h| h < tri.z_min());
            let hi = heights.partition_point(|&h| h <= tri.z_max());
            (lo..hi).collect()
        })
        .collect();

    let mut per_layer: Vec<Vec<usize>> = vec![Vec::new(); heights.len()];
    for (t, spans) in table.iter().enumerate() {
        for &k in spans {
            per_layer[k].push(t);
        }
    }

    heights
        .par_iter()
        .zip(per_layer.par_iter())
        .map(|(&z, ids)| layer_from(z, triangles, ids))
        .collect()
}

/// Every triangle against every height.
pub fn slice_naive(triangles: &[Triangle], heights: &[f64]) -> Vec<Layer> {
    let all: Vec<usize> = (0..triangles.len()).collect();
    heights
        .par_iter()
        .map(|&z| layer_from(z, triangles, &all))
        .collect()
}
