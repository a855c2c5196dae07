//! Per-height geometry carried through the pipeline.

use lamina_geom::{Polyline, Segment};

/// Geometry at one Z height.
///
/// Each pipeline stage fills in its own fields: slicing sets `segments`,
/// linking turns them into `contours` and clears them, end-face detection
/// sets the shell/solid/sparse regions, support detection sets
/// `support_contours`, and path generation fills the `*_paths` fields.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    /// Height of the cutting plane.
    pub z: f64,
    /// Raw plane/mesh crossings, consumed by linking.
    pub segments: Vec<Segment>,
    /// Closed model contours.
    pub contours: Vec<Polyline>,
    /// Chains that never closed during linking.
    pub open_contours: Vec<Polyline>,
    /// Inner boundary of the shell.
    pub shell_contours: Vec<Polyline>,
    /// Solid fill regions.
    pub solid_contours: Vec<Polyline>,
    /// Sparse fill regions.
    pub sparse_contours: Vec<Polyline>,
    /// Support regions.
    pub support_contours: Vec<Polyline>,
    /// Shell (contour-parallel) paths.
    pub shell_paths: Vec<Polyline>,
    /// Solid fill paths.
    pub solid_paths: Vec<Polyline>,
    /// Sparse fill paths.
    pub sparse_paths: Vec<Polyline>,
    /// Support outline paths.
    pub support_outline_paths: Vec<Polyline>,
    /// Support fill paths.
    pub support_fill_paths: Vec<Polyline>,
}

impl Layer {
    /// Create an empty layer at `z`.
    pub fn new(z: f64) -> Self {
        Self {
            z,
            ..Default::default()
        }
    }

    /// Create a layer holding raw segments.
    pub fn with_segments(z: f64, segments: Vec<Segment>) -> Self {
        Self {
            z,
            segments,
            ..Default::default()
        }
    }

    /// Create a layer holding closed contours.
    pub fn with_contours(z: f64, contours: Vec<Polyline>) -> Self {
        Self {
            z,
            contours,
            ..Default::default()
        }
    }

    /// Paths in print order: support outlines, support fill, shell, solid
    /// fill, sparse fill.
    pub fn paths_in_print_order(&self) -> impl Iterator<Item = &Polyline> {
        self.support_outline_paths
            .iter()
            .chain(&self.support_fill_paths)
            .chain(&self.shell_paths)
            .chain(&self.solid_paths)
            .chain(&self.sparse_paths)
    }

    /// Total number of paths.
    pub fn path_count(&self) -> usize {
        self.paths_in_print_order().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_order() {
        let mut layer = Layer::new(1.0);
        layer.sparse_paths.push(Polyline::rectangle(0.0, 0.0, 1.0, 1.0, 1.0));
        layer.support_outline_paths.push(Polyline::rectangle(5.0, 5.0, 6.0, 6.0, 1.0));
        let first = layer.paths_in_print_order().next().unwrap();
        assert_eq!(first.points[0].x, 5.0);
        assert_eq!(layer.path_count(), 2);
    }
}
