//! Top and bottom skin detection.
//!
//! Each layer's contours are shrunk by the shell thickness to get the shell
//! interior. Whatever part of a layer the neighbouring layer does not cover
//! is an end face; it is grown back by the shell thickness and clipped to
//! the shell interior to get the solid fill region. Once an end face is
//! found the same reference layer is kept for the next `end_layers`
//! layers, so skins come out that many layers thick.

use lamina_geom::Polyline;
use lamina_math::Tolerance;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::clip::{clip, offset, ClipOp, Fill, Join};
use crate::layer::Layer;

/// Shell interior and solid region of one layer against a reference layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndFace {
    /// Inner boundary of the shell; empty when the shell fills the layer.
    pub shell: Vec<Polyline>,
    /// Solid fill region, `None` when no end face was found.
    pub solid: Option<Vec<Polyline>>,
}

impl EndFace {
    /// Check if the layer has a solid region.
    pub fn is_end(&self) -> bool {
        self.solid.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Compare `current` against `reference`, the layer it rests on (or hangs
/// under, when scanning downwards).
pub fn pick_end_face(
    reference: &[Polyline],
    current: &[Polyline],
    shell_thickness: f64,
    tol: &Tolerance,
) -> EndFace {
    let shell = offset(current, -shell_thickness, Join::Round);
    if shell.is_empty() {
        return EndFace::default();
    }

    let exposed = if reference.is_empty() {
        Ok(current.to_vec())
    } else {
        let covered = offset(reference, tol.safety_inflate, Join::Square);
        clip(current, &covered, ClipOp::Difference, Fill::EvenOdd, tol.min_region_area)
    };
    let solid = exposed.and_then(|exposed| {
        if exposed.is_empty() {
            return Ok(None);
        }
        let grown = offset(&exposed, shell_thickness, Join::Round);
        clip(&grown, &shell, ClipOp::Intersection, Fill::EvenOdd, tol.min_region_area).map(Some)
    });
    let solid = solid.unwrap_or_else(|e| {
        let z = shell.first().and_then(Polyline::start).map_or(0.0, |p| p.z);
        warn!(z, error = %e, "End face detection failed, layer treated as sparse");
        None
    });
    EndFace { shell, solid }
}

/// One scan over `contours` in order, with an empty layer before the first.
///
/// Returns the shell interior and solid region for every layer.
pub fn scan_end_faces(
    contours: &[&[Polyline]],
    shell_thickness: f64,
    end_layers: usize,
    tol: &Tolerance,
) -> (Vec<Vec<Polyline>>, Vec<Vec<Polyline>>) {
    let n = contours.len();
    let end_layers = end_layers.max(1);

    let mut shells = vec![Vec::new(); n];
    let mut solids = vec![Vec::new(); n];
    let mut pick = |i: usize, j: usize| {
        let face = pick_end_face(layer_at(contours, i), layer_at(contours, j), shell_thickness, tol);
        let is_end = face.is_end();
        if !face.shell.is_empty() {
            shells[j - 1] = face.shell;
        }
        if let Some(solid) = face.solid {
            solids[j - 1] = solid;
        }
        is_end
    };

    let (mut i, mut j) = (0, 1);
    while j <= n {
        if pick(i, j) {
            let mut is_end = true;
            let mut count = 0;
            while is_end && count < end_layers {
                j += 1;
                count += 1;
                if j > n {
                    break;
                }
                is_end = pick(i, j);
            }
            i = j - 1;
        } else {
            i += 1;
            j += 1;
        }
    }
    (shells, solids)
}

fn layer_at<'a>(contours: &[&'a [Polyline]], k: usize) -> &'a [Polyline] {
    if k == 0 {
        &[]
    } else {
        contours[k - 1]
    }
}

/// Sparse region: shell interior minus solid region.
pub fn sparse_region(shell: &[Polyline], solid: &[Polyline], z: f64) -> Vec<Polyline> {
    if solid.is_empty() {
        return shell.to_vec();
    }
    clip(shell, solid, ClipOp::Difference, Fill::EvenOdd, 0.0).unwrap_or_else(|e| {
        warn!(z, error = %e, "Sparse region difference failed, skipping sparse fill");
        Vec::new()
    })
}

/// Fill every layer's shell, solid and sparse regions from both scan
/// directions.
pub fn id_end_layers(layers: &mut [Layer], shell_thickness: f64, end_layers: usize, tol: &Tolerance) {
    info!(layers = layers.len(), end_layers, "Identifying end faces");
    let upward: Vec<&[Polyline]> = layers.iter().map(|l| l.contours.as_slice()).collect();
    let (shells, lower) = scan_end_faces(&upward, shell_thickness, end_layers, tol);
    let downward: Vec<&[Polyline]> = upward.iter().rev().copied().collect();
    let (_, mut upper) = scan_end_faces(&downward, shell_thickness, end_layers, tol);
    upper.reverse();

    layers
        .par_iter_mut()
        .zip(shells.into_par_iter().zip(lower.into_par_iter().zip(upper)))
        .for_each(|(layer, (shell, (lower, upper)))| {
            let solid = match (lower.is_empty(), upper.is_empty()) {
                (true, _) => upper,
                (false, true) => lower,
                (false, false) => clip(&upper, &lower, ClipOp::Union, Fill::NonZero, 0.0)
                    .unwrap_or_else(|e| {
                        warn!(z = layer.z, error = %e, "Skin union failed, keeping lower skin");
                        lower
                    }),
            };
            layer.sparse_contours = sparse_region(&shell, &solid, layer.z);
            layer.shell_contours = shell;
            layer.solid_contours = solid;
        });

    let skins = layers.iter().filter(|l| !l.solid_contours.is_empty()).count();
    debug!(skins, "End faces identified");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_geom::total_area;

    const TOL: Tolerance = Tolerance::DEFAULT;

    fn square(size: f64, z: f64) -> Vec<Polyline> {
        vec![Polyline::rectangle(0.0, 0.0, size, size, z)]
    }

    fn area(polys: &[Polyline]) -> f64 {
        polys.iter().map(Polyline::area).sum()
    }

    #[test]
    fn test_first_layer_is_end_face() {
        let face = pick_end_face(&[], &square(20.0, 0.0), 2.0, &TOL);
        assert!(face.is_end());
        assert!((area(&face.shell) - 256.0).abs() < 1e-3);
        // The whole shell interior becomes solid.
        assert!((area(face.solid.as_ref().unwrap()) - 256.0).abs() < 1e-3);
    }

    #[test]
    fn test_covered_layer_is_not_end_face() {
        let face = pick_end_face(&square(20.0, 0.0), &square(20.0, 0.2), 2.0, &TOL);
        assert!(!face.is_end());
        assert!(face.solid.is_none());
        assert!(!face.shell.is_empty());
    }

    #[test]
    fn test_thin_layer_has_no_shell() {
        let face = pick_end_face(&[], &square(3.0, 0.0), 2.0, &TOL);
        assert_eq!(face, EndFace::default());
    }

    #[test]
    fn test_overhang_gets_solid_region() {
        // A wider layer over a narrow one exposes the overhanging strip.
        let narrow = square(20.0, 0.0);
        let wide = vec![Polyline::rectangle(0.0, 0.0, 40.0, 20.0, 0.2)];
        let face = pick_end_face(&narrow, &wide, 2.0, &TOL);
        assert!(face.is_end());
        let solid = face.solid.unwrap();
        let (min, max) = solid[0].bounds_2d().unwrap();
        assert!(min[0] > 17.0 && min[0] < 19.0);
        assert!((max[0] - 38.0).abs() < 1e-3);
    }

    #[test]
    fn test_scan_marks_skin_layers() {
        let layers: Vec<Vec<Polyline>> = (0..10).map(|k| square(20.0, k as f64 * 0.2)).collect();
        let refs: Vec<&[Polyline]> = layers.iter().map(Vec::as_slice).collect();
        let (shells, solids) = scan_end_faces(&refs, 2.0, 3, &TOL);
        assert!(shells.iter().all(|s| !s.is_empty()));
        let skin: Vec<bool> = solids.iter().map(|s| !s.is_empty()).collect();
        assert_eq!(skin, [true, true, true, true, false, false, false, false, false, false]);
    }

    #[test]
    fn test_id_end_layers_top_and_bottom() {
        let mut layers: Vec<Layer> = (0..10)
            .map(|k| Layer::with_contours(k as f64 * 0.2, square(20.0, k as f64 * 0.2)))
            .collect();
        id_end_layers(&mut layers, 2.0, 3, &TOL);
        let skin: Vec<bool> = layers.iter().map(|l| !l.solid_contours.is_empty()).collect();
        assert_eq!(skin, [true, true, true, true, false, false, true, true, true, true]);
        for layer in &layers {
            let parts = total_area(&layer.solid_contours).abs() + total_area(&layer.sparse_contours).abs();
            assert!((parts - 256.0).abs() < 1e-3);
        }
        assert!(layers[5].solid_contours.is_empty());
        assert!((area(&layers[5].sparse_contours) - 256.0).abs() < 1e-3);
    }
}
