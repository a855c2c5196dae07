//! Adaptor over the integer-coordinate polygon Boolean kernel.
//!
//! Coordinates are scaled by 10^7 and rounded before they reach the
//! kernel and scaled back afterwards. Results come back as closed
//! [`Polyline`]s at the height of the first input contour.

use clipper2::{EndType, FillRule, JoinType, Paths, PointScaler};
use lamina_geom::Polyline;
use lamina_math::Point3;

use crate::{Result, SlicerError};

/// Fixed-point scale between millimetres and kernel units.
pub const SCALE: f64 = 1e7;

/// Miter limit for [`Join::Miter`] offsets, in multiples of the delta.
pub const MITER_LIMIT: f64 = 2.0;

/// Kernel point scaler with seven decimal digits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal7;

impl PointScaler for Decimal7 {
    const MULTIPLIER: f64 = SCALE;
}

/// Corner style when offsetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// Squared-off corners at the offset distance.
    Square,
    /// Arcs around convex corners.
    Round,
    /// Sharp corners up to [`MITER_LIMIT`].
    Miter,
}

/// Rule deciding which regions of overlapping paths are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Odd winding numbers are inside.
    EvenOdd,
    /// Non-zero winding numbers are inside.
    NonZero,
    /// Positive winding numbers are inside.
    Positive,
}

/// Boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    /// Area covered by both operands.
    Intersection,
    /// Area covered by either operand.
    Union,
    /// Subject minus clip.
    Difference,
    /// Area covered by exactly one operand.
    Xor,
}

impl From<Join> for JoinType {
    fn from(j: Join) -> Self {
        match j {
            Join::Square => JoinType::Square,
            Join::Round => JoinType::Round,
            Join::Miter => JoinType::Miter,
        }
    }
}

impl From<Fill> for FillRule {
    fn from(f: Fill) -> Self {
        match f {
            Fill::EvenOdd => FillRule::EvenOdd,
            Fill::NonZero => FillRule::NonZero,
            Fill::Positive => FillRule::Positive,
        }
    }
}

fn to_paths(polys: &[Polyline]) -> Paths<Decimal7> {
    let raw: Vec<Vec<(f64, f64)>> = polys
        .iter()
        .map(|poly| {
            let n = if poly.is_closed() {
                poly.len() - 1
            } else {
                poly.len()
            };
            poly.points[..n].iter().map(|p| (p.x, p.y)).collect()
        })
        .filter(|path: &Vec<(f64, f64)>| path.len() >= 3)
        .collect();
    raw.into()
}

fn from_paths(paths: Paths<Decimal7>, z: f64, min_area: f64) -> Vec<Polyline> {
    let raw: Vec<Vec<(f64, f64)>> = paths.into();
    raw.into_iter()
        .filter(|path| path.len() >= 3)
        .map(|path| Polyline::closed_from(path.into_iter().map(|(x, y)| Point3::new(x, y, z)).collect()))
        .filter(|poly| poly.area() >= min_area)
        .collect()
}

fn height_of(polys: &[Polyline]) -> f64 {
    polys
        .iter()
        .find_map(|p| p.start())
        .map(|p| p.z)
        .unwrap_or(0.0)
}

/// Offset closed contours by `delta` (negative shrinks outer boundaries).
///
/// An empty result means the offset consumed the region. Miter joins are
/// limited to [`MITER_LIMIT`]; see [`offset_with`].
pub fn offset(polys: &[Polyline], delta: f64, join: Join) -> Vec<Polyline> {
    offset_with(polys, delta, join, MITER_LIMIT)
}

/// [`offset`] with an explicit miter limit, in multiples of `delta`.
///
/// Round joins use the kernel's automatic arc tolerance (a fraction of
/// `delta`); the binding exposes no override.
pub fn offset_with(polys: &[Polyline], delta: f64, join: Join, miter_limit: f64) -> Vec<Polyline> {
    if polys.is_empty() {
        return Vec::new();
    }
    let z = height_of(polys);
    // The binding scales the limit like a coordinate; it is a ratio.
    let limit = miter_limit / SCALE;
    let out = clipper2::inflate(to_paths(polys), delta, join.into(), EndType::Polygon, limit);
    from_paths(out, z, 0.0)
}

/// Boolean operation between two contour sets.
///
/// Result contours with area below `min_area` are dropped.
pub fn clip(
    subject: &[Polyline],
    clip: &[Polyline],
    op: ClipOp,
    fill: Fill,
    min_area: f64,
) -> Result<Vec<Polyline>> {
    let z = if subject.is_empty() {
        height_of(clip)
    } else {
        height_of(subject)
    };
    let trivially_empty = match op {
        ClipOp::Intersection => subject.is_empty() || clip.is_empty(),
        ClipOp::Difference => subject.is_empty(),
        ClipOp::Union | ClipOp::Xor => subject.is_empty() && clip.is_empty(),
    };
    if trivially_empty {
        return Ok(Vec::new());
    }

    let rule: FillRule = fill.into();
    // One-sided operations reduce to normalizing the other side.
    let (op, subject, clip) = match (op, subject.is_empty(), clip.is_empty()) {
        (ClipOp::Union | ClipOp::Xor, true, false) => (ClipOp::Union, clip, clip),
        (ClipOp::Union | ClipOp::Xor | ClipOp::Difference, false, true) => {
            (ClipOp::Union, subject, subject)
        }
        _ => (op, subject, clip),
    };
    let subject_paths = to_paths(subject);
    let clip_paths = to_paths(clip);
    let result = match op {
        ClipOp::Intersection => clipper2::intersect(subject_paths, clip_paths, rule),
        ClipOp::Union => clipper2::union(subject_paths, clip_paths, rule),
        ClipOp::Difference => clipper2::difference(subject_paths, clip_paths, rule),
        ClipOp::Xor => clipper2::xor(subject_paths, clip_paths, rule),
    }
    .map_err(|e| SlicerError::Clip(format!("{e:?}")))?;
    Ok(from_paths(result, z, min_area))
}

/// Union of all contours in one set.
pub fn union_all(polys: &[Polyline], fill: Fill) -> Result<Vec<Polyline>> {
    clip(polys, polys, ClipOp::Union, fill, 0.0)
}

/// Remove slivers and self-touching noise: offset by `+precision`, then by
/// `-precision`, with miter joins.
pub fn clean_contours(polys: &[Polyline], precision: f64) -> Vec<Polyline> {
    let grown = offset(polys, precision, Join::Miter);
    offset(&grown, -precision, Join::Miter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_geom::total_area;

    fn subject() -> Vec<Polyline> {
        vec![Polyline::rectangle(0.0, 0.0, 100.0, 70.0, 0.0)]
    }

    fn window() -> Vec<Polyline> {
        vec![Polyline::rectangle(30.0, 50.0, 70.0, 100.0, 0.0)]
    }

    fn corners(poly: &Polyline) -> usize {
        poly.len() - 1
    }

    #[test]
    fn test_intersection_of_rectangles() {
        let out = clip(&subject(), &window(), ClipOp::Intersection, Fill::NonZero, 0.0).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].area() - 800.0).abs() < 1e-6);
        let (min, max) = out[0].bounds_2d().unwrap();
        assert!((min[0] - 30.0).abs() < 1e-6 && (min[1] - 50.0).abs() < 1e-6);
        assert!((max[0] - 70.0).abs() < 1e-6 && (max[1] - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_of_rectangles() {
        let out = clip(&subject(), &window(), ClipOp::Union, Fill::NonZero, 0.0).unwrap();
        assert_eq!(out.len(), 1);
        // 7000 + 2000 - 800
        assert!((out[0].area() - 8200.0).abs() < 1e-6);
        assert_eq!(corners(&out[0]), 8);
    }

    #[test]
    fn test_xor_of_rectangles() {
        let out = clip(&subject(), &window(), ClipOp::Xor, Fill::NonZero, 0.0).unwrap();
        assert!(!out.is_empty());
        // 8200 - 800
        assert!((total_area(&out).abs() - 7400.0).abs() < 1e-6);
    }

    #[test]
    fn test_difference_min_area_filter() {
        let big = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)];
        let cut = vec![Polyline::rectangle(0.5, -1.0, 11.0, 11.0, 0.0)];
        let kept = clip(&big, &cut, ClipOp::Difference, Fill::EvenOdd, 0.0).unwrap();
        assert_eq!(kept.len(), 1);
        assert!((kept[0].area() - 5.0).abs() < 1e-6);
        let filtered = clip(&big, &cut, ClipOp::Difference, Fill::EvenOdd, 6.0).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_inward_square_offset() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 100.0, 100.0, 0.0)];
        let out = offset(&sq, -5.0, Join::Square);
        assert_eq!(out.len(), 1);
        assert!((out[0].area() - 8100.0).abs() < 1e-6);
        let (min, max) = out[0].bounds_2d().unwrap();
        assert!((min[0] - 5.0).abs() < 1e-6 && (max[1] - 95.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_out_and_back() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 40.0, 40.0, 2.0)];
        for join in [Join::Miter, Join::Round, Join::Square] {
            let grown = offset(&sq, 1.0, join);
            let back = offset(&grown, -1.0, join);
            assert_eq!(back.len(), 1);
            assert!((back[0].area() - 1600.0).abs() < 1.0, "{join:?}");
            assert_eq!(back[0].points[0].z, 2.0);
        }
    }

    #[test]
    fn test_miter_limit_squares_sharp_corners() {
        let sliver = vec![Polyline::closed_from(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(20.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ])];
        let clipped = offset(&sliver, 1.0, Join::Miter);
        let sharp = offset_with(&sliver, 1.0, Join::Miter, 20.0);
        assert_eq!(clipped.len(), 1);
        assert_eq!(sharp.len(), 1);
        assert!(sharp[0].area() > clipped[0].area() + 1.0);
        // A right angle stays sharp under the default limit.
        let sq = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)];
        assert!((offset(&sq, 1.0, Join::Miter)[0].area() - 144.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_consumes_small_region() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 4.0, 4.0, 0.0)];
        assert!(offset(&sq, -2.5, Join::Square).is_empty());
    }

    #[test]
    fn test_clean_keeps_square() {
        let sq = vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.0)];
        let out = clean_contours(&sq, 0.02);
        assert_eq!(out.len(), 1);
        assert!((out[0].area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(offset(&[], 1.0, Join::Round).is_empty());
        assert!(clip(&[], &window(), ClipOp::Difference, Fill::NonZero, 0.0).unwrap().is_empty());
        assert!(clip(&subject(), &[], ClipOp::Intersection, Fill::NonZero, 0.0).unwrap().is_empty());
    }
}
