#![warn(missing_docs)]

//! Mesh slicing and contour topology for additive manufacturing.
//!
//! This crate cuts a triangle mesh into horizontal layers, links the
//! crossings into oriented contours, and derives shell, solid, sparse and
//! support regions together with the toolpaths that fill them.
//!
//! # Example
//!
//! ```ignore
//! use lamina_mesh::read_stl;
//! use lamina_slicer::{slice, PrintSettings};
//!
//! let mesh = read_stl("part.stl")?;
//! let layers = slice(&mesh, &PrintSettings::default())?;
//!
//! println!("Layers: {}", layers.len());
//! ```

pub mod clip;
pub mod endfaces;
pub mod error;
pub mod fill;
pub mod hatch;
pub mod hollow;
pub mod layer;
pub mod link;
pub mod nesting;
pub mod orient;
pub mod pipeline;
pub mod settings;
pub mod shell;
pub mod slc;
pub mod slice;
pub mod split;
pub mod support;
pub mod topo;

pub use clip::{clean_contours, clip, offset, offset_with, union_all, ClipOp, Fill, Join};
pub use endfaces::{id_end_layers, pick_end_face, EndFace};
pub use error::{Result, SlicerError};
pub use fill::{gen_dp_path, gen_dp_path_ex};
pub use hatch::{gen_hatches, scan_heights};
pub use hollow::{hollow_layers, hollow_mesh};
pub use layer::Layer;
pub use link::{clean_layers, link_layers, link_segments, LinkReport, LinkResult};
pub use nesting::NestingForest;
pub use orient::{optimize_orientation, OrientSettings, Orientation};
pub use pipeline::{Pipeline, Stage};
pub use settings::{LinkStrategy, PrintSettings, SlicingStrategy, SupportFill};
pub use shell::gen_cp_path;
pub use slc::{read_slc, write_slc};
pub use slice::{layer_heights, slice_mesh};
pub use split::split_region;
pub use support::{gen_support_paths, SupportGrid};
pub use topo::TopoSlicer;

use lamina_mesh::Mesh;

/// Run a whole print job and return its layers with ordered toolpaths.
///
/// This is the main entry point for slicing. It:
/// 1. Slices the mesh into layers
/// 2. Links segments into contours (and hollows them if asked)
/// 3. Splits each layer into shell, solid and sparse regions
/// 4. Optionally computes support regions
/// 5. Generates and orders toolpaths
pub fn slice(mesh: &Mesh, settings: &PrintSettings) -> Result<Vec<Layer>> {
    let mut job = Pipeline::new(mesh, settings.clone())?;
    job.run()?;
    Ok(job.into_layers())
}
