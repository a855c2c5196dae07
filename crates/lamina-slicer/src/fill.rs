//! Direction-parallel (zig-zag) fill paths.

use lamina_geom::{rotate_polygons, Polyline, Segment};
use lamina_math::{Point3, Tolerance};

use crate::hatch::{gen_hatches, scan_heights};
use crate::split::split_region;

/// Join hatch segments of one region into a single zig-zag path.
///
/// Segments are ordered by row, then by X; even segments run left to right
/// and odd ones right to left. The move between two segments is tagged as
/// travel.
pub fn link_local_hatches(mut segments: Vec<Segment>) -> Polyline {
    segments.sort_by(|l, r| {
        let row = |s: &Segment| (s.a.y * 1e4).round() as i64;
        row(l).cmp(&row(r)).then(l.a.x.total_cmp(&r.a.x))
    });
    let mut path = Polyline::new();
    let last = segments.len().saturating_sub(1);
    for (i, seg) in segments.iter().enumerate() {
        if i % 2 == 0 {
            path.push(seg.a);
            path.push(seg.b);
        } else {
            path.push(seg.b);
            path.push(seg.a);
        }
        if i != last {
            path.mark_last_travel();
        }
    }
    path
}

/// Zig-zag fill of a region with lines `interval` apart at `angle`
/// radians, on the grid through the origin.
pub fn gen_dp_path(polys: &[Polyline], interval: f64, angle: f64, tol: &Tolerance) -> Vec<Polyline> {
    gen_dp_path_ex(polys, interval, angle, None, None, tol)
}

/// Zig-zag fill with explicit scan heights and rotation center.
///
/// `ys` are heights in the rotated frame; when `None` they come from the
/// global grid over the rotated region.
pub fn gen_dp_path_ex(
    polys: &[Polyline],
    interval: f64,
    angle: f64,
    ys: Option<&[f64]>,
    center: Option<Point3>,
    tol: &Tolerance,
) -> Vec<Polyline> {
    if polys.is_empty() || interval <= 0.0 {
        return Vec::new();
    }
    let rotated = rotate_polygons(polys, -angle, center);
    let owned;
    let ys = match ys {
        Some(ys) => ys,
        None => {
            owned = scan_heights(&rotated, interval, tol);
            &owned
        }
    };

    let paths: Vec<Polyline> = split_region(&rotated, tol)
        .into_iter()
        .filter_map(|piece| {
            let segs = gen_hatches(std::slice::from_ref(&piece), ys, tol);
            (!segs.is_empty()).then(|| link_local_hatches(segs))
        })
        .collect();
    rotate_polygons(&paths, angle, center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_geom::{point_in_polygon, Containment};
    use std::f64::consts::FRAC_PI_4;

    const TOL: Tolerance = Tolerance::DEFAULT;

    fn extrusions(path: &Polyline) -> impl Iterator<Item = Segment> + '_ {
        (0..path.len().saturating_sub(1))
            .filter(|&i| !path.is_travel(i))
            .map(|i| Segment::new(path.points[i], path.points[i + 1]))
    }

    #[test]
    fn test_link_local_hatches_zig_zag() {
        let segs = vec![
            Segment::new(Point3::new(0.0, 2.0, 0.0), Point3::new(10.0, 2.0, 0.0)),
            Segment::new(Point3::new(0.0, 1.0, 0.0), Point3::new(10.0, 1.0, 0.0)),
            Segment::new(Point3::new(0.0, 3.0, 0.0), Point3::new(10.0, 3.0, 0.0)),
        ];
        let path = link_local_hatches(segs);
        assert_eq!(path.len(), 6);
        assert_eq!(path.points[0], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(path.points[2], Point3::new(10.0, 2.0, 0.0));
        assert_eq!(path.points[5], Point3::new(10.0, 3.0, 0.0));
        assert_eq!(path.travel_count(), 2);
        assert!(path.is_travel(1) && path.is_travel(3));
    }

    #[test]
    fn test_square_fill() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)];
        let paths = gen_dp_path(&sq, 1.0, 0.0, &TOL);
        assert_eq!(paths.len(), 1);
        // Rows 1 through 10; the row on the bottom edge yields nothing.
        assert_eq!(paths[0].len(), 20);
        assert_eq!(paths[0].travel_count(), 9);
    }

    #[test]
    fn test_rotated_fill_stays_inside() {
        let sq = Polyline::rectangle(0.0, 0.0, 20.0, 20.0, 0.0);
        let paths = gen_dp_path(std::slice::from_ref(&sq), 0.5, FRAC_PI_4, &TOL);
        assert!(!paths.is_empty());
        for path in &paths {
            for seg in extrusions(path) {
                let mid = Point3::from((seg.a.coords + seg.b.coords) / 2.0);
                assert_ne!(point_in_polygon(&mid, &sq), Containment::Outside);
                // Hatches run along the fill direction.
                let d = seg.direction();
                assert!((d.x - d.y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_fill_avoids_hole() {
        let outer = Polyline::rectangle(0.0, 0.0, 30.0, 30.0, 0.0);
        let mut hole = Polyline::rectangle(10.0, 10.0, 20.0, 20.0, 0.0);
        hole.make_cw();
        let paths = gen_dp_path(&[outer, hole.clone()], 1.0, 0.0, &TOL);
        // Split into four pieces, one path each.
        assert_eq!(paths.len(), 4);
        for path in &paths {
            for seg in extrusions(path) {
                let mid = Point3::from((seg.a.coords + seg.b.coords) / 2.0);
                assert_ne!(point_in_polygon(&mid, &hole), Containment::Inside);
            }
        }
    }

    #[test]
    fn test_explicit_heights() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)];
        let paths = gen_dp_path_ex(&sq, 1.0, 0.0, Some(&[2.5, 7.5]), None, &TOL);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 4);
    }
}
