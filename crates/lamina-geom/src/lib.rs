#![warn(missing_docs)]

//! Geometric primitives and predicates for slicing.
//!
//! Leaf value types (lines, rays, segments, planes, triangles, polylines)
//! and the tolerance-aware predicates built on them. Every stage of the
//! slicer agrees on the same [`EPSILON`] so that containment, coincidence
//! and plane tests never disagree about a boundary point.

mod polygon;
mod polyline;
mod primitives;
pub mod query;

pub use polygon::{
    adjust_polygon_dirs, adjust_polygon_dirs_with, intersect_triangle_plane, intersect_triangle_z,
    point_in_polygon, rotate_polygons, total_area, Containment, ContainmentFn,
};
pub use polyline::Polyline;
pub use primitives::{Line, Plane, Ray, Segment, Triangle};
pub use query::{distance, intersect, Intersection, Primitive};

/// Absolute coordinate tolerance.
pub const EPSILON: f64 = lamina_math::Tolerance::DEFAULT.epsilon;

/// Tolerance on squared distances.
pub const EPSILON_SQ: f64 = lamina_math::Tolerance::DEFAULT.epsilon_sq;
