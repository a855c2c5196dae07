//! Support region synthesis.
//!
//! A grid of vertical lines is dropped through the model. Every facet a
//! line passes through is recorded as a hit (height and tilt), and the
//! hits of one line are read in pairs from the model's floor upwards: a
//! line needs support between a pair's heights when the upper facet of
//! the pair is flatter than the critical angle.

use std::f64::consts::FRAC_PI_2;

use lamina_geom::{Polyline, Triangle};
use lamina_math::{Point3, Tolerance, Vec3};
use lamina_mesh::Mesh;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::clip::{clip, offset, union_all, ClipOp, Fill, Join};
use crate::fill::gen_dp_path_ex;
use crate::layer::Layer;
use crate::settings::PrintSettings;

/// Hits are rounded to this many decimals.
const DIGITS: i32 = 3;

fn round_to(v: f64, digits: i32) -> f64 {
    let f = 10f64.powi(digits);
    (v * f).round() / f
}

/// A facet crossing of one grid line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Height of the crossing.
    pub z: f64,
    /// Facet tilt from horizontal in `[0, pi/2]`.
    pub angle: f64,
    /// Whether the facet faces upwards.
    pub up: bool,
}

/// Vertical grid lines through a mesh and the facets each one crosses.
#[derive(Debug, Clone)]
pub struct SupportGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Adjusted cell size along X and Y.
    pub cell: (f64, f64),
    /// Sorted hits per grid point, `xs`-major; the first entry is the floor.
    columns: Vec<Vec<Hit>>,
}

/// Grid coordinates from `min` to `max` in steps that divide the range
/// evenly and are no larger than `size`.
fn axis(min: f64, max: f64, size: f64) -> (Vec<f64>, f64) {
    let span = max - min;
    let step = span / ((span / size).floor() + 1.0);
    if step <= 0.0 {
        return (vec![round_to(min, DIGITS)], 0.0);
    }
    let mut coords = Vec::new();
    let mut v = min;
    while v <= max {
        coords.push(round_to(v, DIGITS));
        v += step;
    }
    (coords, step)
}

/// Tilt of a facet from horizontal, folded into `[0, pi/2]`.
fn facet_angle(normal: &Vec3) -> f64 {
    let angle = normal.angle(&Vec3::z());
    let folded = if angle > FRAC_PI_2 {
        std::f64::consts::PI - angle
    } else {
        angle
    };
    round_to(folded, DIGITS).clamp(0.0, FRAC_PI_2)
}

fn tri_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    0.5 * ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs()
}

/// Area-sum test on the XY projection.
fn in_projection(p: (f64, f64), tri: &Triangle) -> bool {
    let (a, b, c) = ((tri.a.x, tri.a.y), (tri.b.x, tri.b.y), (tri.c.x, tri.c.y));
    let whole = tri_area(a, b, c);
    (tri_area(p, a, b) + tri_area(p, b, c) + tri_area(p, a, c) - whole).abs() < 1e-7
}

impl SupportGrid {
    /// Drop grid lines at most `grid_size` apart through `mesh`.
    ///
    /// Returns `None` for an empty mesh or a non-positive grid size.
    pub fn build(mesh: &Mesh, grid_size: f64) -> Option<Self> {
        let bounds = mesh.bounds()?;
        if grid_size <= 0.0 {
            return None;
        }
        let (xs, ax) = axis(bounds.min.x, bounds.max.x, grid_size);
        let (ys, ay) = axis(bounds.min.y, bounds.max.y, grid_size);
        let floor = Hit {
            z: round_to(bounds.min.z, DIGITS),
            angle: 0.0,
            up: false,
        };
        let ny = ys.len();

        let hits: Vec<(usize, Hit)> = mesh
            .triangles
            .par_iter()
            .flat_map_iter(|tri| {
                let n = tri.normal;
                // Vertical facets are never crossed by a vertical line.
                let flat = n.z.abs() >= Tolerance::DEFAULT.epsilon;
                let (x0, x1) = (tri.a.x.min(tri.b.x).min(tri.c.x), tri.a.x.max(tri.b.x).max(tri.c.x));
                let (y0, y1) = (tri.a.y.min(tri.b.y).min(tri.c.y), tri.a.y.max(tri.b.y).max(tri.c.y));
                let ix = xs.partition_point(|&x| x < x0);
                let iy = ys.partition_point(|&y| y < y0);
                let xs = &xs;
                let ys = &ys;
                (ix..xs.len())
                    .take_while(move |&i| flat && xs[i] <= x1)
                    .flat_map(move |i| {
                        (iy..ys.len())
                            .take_while(move |&j| ys[j] <= y1)
                            .filter(move |&j| in_projection((xs[i], ys[j]), tri))
                            .map(move |j| {
                                // Plane through `a` with normal `n`, at (x, y).
                                let z = tri.a.z - (n.x * (xs[i] - tri.a.x) + n.y * (ys[j] - tri.a.y)) / n.z;
                                let hit = Hit {
                                    z: round_to(z, DIGITS),
                                    angle: facet_angle(&n),
                                    up: n.z > 0.0,
                                };
                                (i * ny + j, hit)
                            })
                    })
            })
            .collect();

        let mut facets: Vec<Vec<Hit>> = vec![Vec::new(); xs.len() * ny];
        for (k, hit) in hits {
            facets[k].push(hit);
        }
        let columns = facets
            .into_iter()
            .map(|mut column| {
                column.sort_by(|l, r| l.z.total_cmp(&r.z));
                // A line through an edge shared by two facets facing the same
                // way hits the surface once.
                column.dedup_by(|l, r| l.z == r.z && l.up == r.up);
                let mut out = Vec::with_capacity(column.len() + 1);
                out.push(floor);
                out.extend(column);
                out
            })
            .collect();

        Some(Self {
            xs,
            ys,
            cell: (ax, ay),
            columns,
        })
    }

    /// Number of grid lines.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the grid has no lines.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Hits of the line at grid position `(i, j)`.
    pub fn column(&self, i: usize, j: usize) -> &[Hit] {
        &self.columns[i * self.ys.len() + j]
    }

    /// A hit pair spans a supported column when its upper facet is at most
    /// `critical_angle` off horizontal.
    fn overhangs(pair: &[Hit], critical_angle: f64) -> bool {
        pair[1].angle <= critical_angle
    }

    fn needs_support(hits: &[Hit], z: f64, critical_angle: f64) -> bool {
        hits.chunks_exact(2)
            .any(|pair| pair[0].z <= z && z <= pair[1].z && Self::overhangs(pair, critical_angle))
    }

    /// Grid points needing support at height `z`.
    pub fn points_at(&self, z: f64, critical_angle: f64) -> Vec<Point3> {
        let ny = self.ys.len();
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, hits)| Self::needs_support(hits, z, critical_angle))
            .map(|(k, _)| Point3::new(self.xs[k / ny], self.ys[k % ny], z))
            .collect()
    }

    /// Total supported column length times the cell area.
    pub fn volume(&self, critical_angle: f64) -> f64 {
        let length: f64 = self
            .columns
            .iter()
            .flat_map(|hits| hits.chunks_exact(2))
            .filter(|pair| Self::overhangs(pair, critical_angle))
            .map(|pair| pair[1].z - pair[0].z)
            .sum();
        length * self.cell.0 * self.cell.1
    }
}

/// Support region at one layer from its support points.
///
/// Each point grows into a rectangle slightly larger than a grid cell; the
/// union is pushed `xy_gap` away from the model contours. When that last
/// difference fails the raw union is returned.
pub fn support_regions(points: &[Point3], cell: (f64, f64), contours: &[Polyline], xy_gap: f64, z: f64) -> Vec<Polyline> {
    if points.is_empty() {
        return Vec::new();
    }
    let (hx, hy) = (0.55 * cell.0, 0.55 * cell.1);
    let rects: Vec<Polyline> = points
        .iter()
        .map(|p| Polyline::rectangle(p.x - hx, p.y - hy, p.x + hx, p.y + hy, z))
        .collect();
    let raw = match union_all(&rects, Fill::Positive) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(z, error = %e, "Support union failed, layer left without support");
            return Vec::new();
        }
    };
    if raw.is_empty() || contours.is_empty() {
        return raw;
    }
    let keep_out = offset(contours, xy_gap, Join::Square);
    clip(&raw, &keep_out, ClipOp::Difference, Fill::EvenOdd, 0.0).unwrap_or_else(|e| {
        warn!(z, error = %e, "Support clearance failed, keeping raw support region");
        raw
    })
}

/// Fill every layer's support contours.
pub fn find_support_regions(mesh: &Mesh, layers: &mut [Layer], settings: &PrintSettings) {
    let Some(grid) = SupportGrid::build(mesh, settings.support_grid) else {
        warn!("Support grid is empty, no support generated");
        return;
    };
    let critical = settings.support_critical_angle.to_radians();
    info!(lines = grid.len(), cell_x = grid.cell.0, cell_y = grid.cell.1, "Support grid built");
    layers.par_iter_mut().for_each(|layer| {
        let points = grid.points_at(layer.z, critical);
        layer.support_contours = support_regions(&points, grid.cell, &layer.contours, settings.support_xy_gap, layer.z);
    });
    let supported = layers.iter().filter(|l| !l.support_contours.is_empty()).count();
    debug!(supported, "Support regions computed");
}

/// Scan heights shared by all support layers: the model's bounding circle
/// widened by half, about the bounds center.
pub fn support_scan_heights(center: &Point3, radius: f64, interval: f64) -> Vec<f64> {
    let mut ys = Vec::new();
    if interval <= 0.0 {
        return ys;
    }
    let end = center.y + 1.5 * radius;
    let mut y = center.y - 1.5 * radius;
    while y <= end {
        ys.push(y);
        y += interval;
    }
    ys
}

/// Support outline and fill paths for every layer with a support region.
pub fn gen_support_paths(mesh: &Mesh, layers: &mut [Layer], settings: &PrintSettings, tol: &Tolerance) {
    let Some(bounds) = mesh.bounds() else {
        return;
    };
    let center = Point3::new(bounds.center().x, bounds.center().y, 0.0);
    let radius = (Point3::new(bounds.max.x, bounds.max.y, 0.0) - center).norm();
    let interval = settings.support_fill_interval();
    let ys = support_scan_heights(&center, radius, interval);

    layers.par_iter_mut().enumerate().for_each(|(i, layer)| {
        if layer.support_contours.is_empty() {
            layer.support_outline_paths.clear();
            layer.support_fill_paths.clear();
            return;
        }
        let angle = settings.support_angle_for(i);
        layer.support_fill_paths =
            gen_dp_path_ex(&layer.support_contours, interval, angle, Some(&ys), Some(center), tol);
        layer.support_outline_paths = layer.support_contours.clone();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SupportFill;

    fn table() -> Mesh {
        // A 40x40 slab from z=10 to z=12 floating over the floor at z=0,
        // plus a 4x4 leg in one corner down to the floor.
        let mut mesh = Mesh::cuboid(Point3::new(0.0, 0.0, 10.0), Point3::new(40.0, 40.0, 12.0));
        let leg = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 10.0));
        mesh.triangles.extend(leg.triangles);
        mesh
    }

    #[test]
    fn test_axis_divides_range() {
        let (xs, step) = axis(0.0, 10.0, 3.0);
        assert!((step - 2.5).abs() < 1e-12);
        assert_eq!(xs, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_facet_angle_folds() {
        assert_eq!(facet_angle(&Vec3::new(0.0, 0.0, -1.0)), 0.0);
        assert_eq!(facet_angle(&Vec3::new(0.0, 0.0, 1.0)), 0.0);
        assert!((facet_angle(&Vec3::new(1.0, 0.0, 0.0)) - FRAC_PI_2).abs() < 1e-3);
        let down = facet_angle(&Vec3::new(1.0, 0.0, -1.0));
        let up = facet_angle(&Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(down, up);
        assert!((0.0..=FRAC_PI_2).contains(&down));
    }

    #[test]
    fn test_critical_angle_is_inclusive() {
        let hit = |z: f64, angle: f64, up: bool| Hit { z, angle, up };
        let pair = [hit(0.0, 0.0, true), hit(4.0, 0.5, false)];
        assert!(SupportGrid::overhangs(&pair, 0.5));
        assert!(SupportGrid::needs_support(&pair, 2.0, 0.5));
        assert!(!SupportGrid::needs_support(&pair, 2.0, 0.49));
    }

    #[test]
    fn test_cube_needs_no_support() {
        let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(20.0, 20.0, 20.0));
        let grid = SupportGrid::build(&cube, 5.0).unwrap();
        assert!(grid.points_at(10.0, 60f64.to_radians()).is_empty());
        assert_eq!(grid.volume(60f64.to_radians()), 0.0);
        // Floor, bottom face, top face.
        assert_eq!(grid.column(1, 1).len(), 3);
    }

    #[test]
    fn test_overhang_needs_support() {
        let grid = SupportGrid::build(&table(), 5.0).unwrap();
        let critical = 60f64.to_radians();
        let points = grid.points_at(5.0, critical);
        assert!(!points.is_empty());
        // Nothing needs support under the leg or above the slab bottom.
        assert!(points.iter().all(|p| p.x > 4.0 || p.y > 4.0));
        assert!(grid.points_at(11.0, critical).is_empty());
        assert!(grid.volume(critical) > 0.0);
    }

    #[test]
    fn test_support_regions_keep_clear_of_model() {
        let points = vec![Point3::new(10.0, 10.0, 5.0), Point3::new(12.0, 10.0, 5.0)];
        let region = support_regions(&points, (2.0, 2.0), &[], 1.0, 5.0);
        assert_eq!(region.len(), 1);
        let area: f64 = region.iter().map(Polyline::area).sum();
        assert!((area - 4.2 * 2.2).abs() < 1e-6);

        let model = vec![Polyline::rectangle(0.0, 0.0, 10.0, 20.0, 5.0)];
        let cleared = support_regions(&points, (2.0, 2.0), &model, 1.0, 5.0);
        let (min, _) = cleared[0].bounds_2d().unwrap();
        assert!((min[0] - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_support_paths_on_table() {
        let mesh = table();
        let settings = PrintSettings {
            support_enabled: true,
            support_grid: 4.0,
            support_fill: SupportFill::Cross,
            ..Default::default()
        };
        let mut layers: Vec<Layer> = [3.0, 3.2]
            .iter()
            .map(|&z| Layer::with_contours(z, vec![Polyline::rectangle(0.0, 0.0, 4.0, 4.0, z)]))
            .collect();
        find_support_regions(&mesh, &mut layers, &settings);
        assert!(layers.iter().all(|l| !l.support_contours.is_empty()));
        gen_support_paths(&mesh, &mut layers, &settings, &Tolerance::DEFAULT);
        for layer in &layers {
            assert_eq!(layer.support_outline_paths, layer.support_contours);
            assert!(!layer.support_fill_paths.is_empty());
        }
        // Cross fill turns the odd layer's lines by a right angle.
        let dir = |l: &Layer| {
            let p = &l.support_fill_paths[0];
            p.points[1] - p.points[0]
        };
        let (d0, d1) = (dir(&layers[0]), dir(&layers[1]));
        assert!(d0.x.abs() > d0.y.abs());
        assert!(d1.y.abs() > d1.x.abs());
    }

    #[test]
    fn test_scan_heights_cover_bounds() {
        let ys = support_scan_heights(&Point3::new(0.0, 10.0, 0.0), 4.0, 2.0);
        assert_eq!(ys.first().copied(), Some(4.0));
        assert_eq!(ys.last().copied(), Some(16.0));
    }
}
