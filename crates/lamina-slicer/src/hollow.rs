//! Uniform-wall hollowing.
//!
//! A layer may be hollowed by the region that lies at least `W` inside the
//! model in 3D: every layer within `W` of it, at vertical distance `dz`, is
//! shrunk by `sqrt(W^2 - dz^2)`, and the void is the intersection of those
//! shrunk contours. Layers near the model's top or bottom stay solid.

use lamina_geom::Polyline;
use lamina_math::Tolerance;
use lamina_mesh::Mesh;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::clip::{clip, offset, ClipOp, Fill, Join};
use crate::layer::Layer;
use crate::link::{clean_layers, link_layers, LinkReport};
use crate::settings::PrintSettings;
use crate::slice::slice_mesh;
use crate::{Result, SlicerError};

/// Inward offset allowed by a neighbour at vertical distance `dz`.
pub fn allowed_offset(wall: f64, dz: f64, tol: &Tolerance) -> f64 {
    if dz >= wall - tol.hollow_reach {
        0.0
    } else {
        (wall * wall - dz * dz).sqrt()
    }
}

/// Void of layer `i`, or `None` when the layer must stay solid.
fn void_of(layers: &[Layer], i: usize, wall: f64, tol: &Tolerance) -> Option<Vec<Polyline>> {
    let z = layers[i].z;
    let lo = layers[..i]
        .iter()
        .rposition(|l| z - l.z >= wall)
        .map_or(0, |k| k + 1);
    let hi = layers[i + 1..]
        .iter()
        .position(|l| l.z - z >= wall)
        .map_or(layers.len(), |k| i + 1 + k);

    let mut void: Option<Vec<Polyline>> = None;
    for neighbour in layers[lo..hi].iter().filter(|l| !l.contours.is_empty()) {
        let shrunk = offset(&neighbour.contours, -allowed_offset(wall, (z - neighbour.z).abs(), tol), Join::Round);
        if shrunk.is_empty() {
            return None;
        }
        void = Some(match void {
            None => shrunk,
            Some(acc) => match clip(&acc, &shrunk, ClipOp::Intersection, Fill::EvenOdd, 0.0) {
                Ok(next) => next,
                Err(e) => {
                    warn!(z, error = %e, "Void intersection failed, layer kept solid");
                    return None;
                }
            },
        });
        if void.as_ref().is_some_and(Vec::is_empty) {
            return None;
        }
    }
    void
}

/// Hollowed copy of `layers` (ascending Z) with wall thickness `wall`.
///
/// `z_min` and `z_max` are the model's extent; layers closer than the wall
/// to either, less [`Tolerance::hollow_cap`], are copied unchanged.
pub fn hollow_layers(layers: &[Layer], wall: f64, z_min: f64, z_max: f64, tol: &Tolerance) -> Vec<Layer> {
    (0..layers.len())
        .into_par_iter()
        .map(|i| {
            let layer = &layers[i];
            if layer.contours.is_empty() {
                return Layer::new(layer.z);
            }
            let cap = wall - tol.hollow_cap;
            let near_cap = z_max - layer.z < cap || layer.z - z_min < cap;
            let void = if near_cap { None } else { void_of(layers, i, wall, tol) };
            let contours = match void {
                None => layer.contours.clone(),
                Some(void) => clip(&layer.contours, &void, ClipOp::Difference, Fill::EvenOdd, 0.0)
                    .unwrap_or_else(|e| {
                        warn!(z = layer.z, error = %e, "Hollowing failed, layer kept solid");
                        layer.contours.clone()
                    }),
            };
            Layer::with_contours(layer.z, contours)
        })
        .collect()
}

/// Slice, link, heal, clean and hollow `mesh`.
pub fn hollow_mesh(mesh: &Mesh, settings: &PrintSettings, wall: f64, tol: &Tolerance) -> Result<(Vec<Layer>, LinkReport)> {
    if wall <= 0.0 {
        return Err(SlicerError::InvalidSettings(format!("wall thickness must be positive, got {wall}")));
    }
    let bounds = mesh.bounds().ok_or(SlicerError::EmptyMesh)?;
    let mut layers = slice_mesh(mesh, settings.layer_thickness, settings.slicing);
    let report = link_layers(&mut layers, settings.linking, settings.heal_open_contours, tol);
    clean_layers(&mut layers, tol.clean_precision);
    info!(wall, layers = layers.len(), "Hollowing");
    let hollowed = hollow_layers(&layers, wall, bounds.min.z, bounds.max.z, tol);
    Ok((hollowed, report))
}
