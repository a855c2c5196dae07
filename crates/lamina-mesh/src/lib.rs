#![warn(missing_docs)]

//! Mesh model for the lamina slicer.
//!
//! A [`Mesh`] is a plain triangle soup with bounds and placement helpers.
//! It is read from STL with per-vertex validation and is never mutated by
//! the slicing stages that borrow it.
//!
//! # Example
//!
//! ```ignore
//! use lamina_mesh::read_stl;
//!
//! let mesh = read_stl("part.stl")?;
//! let bounds = mesh.bounds().unwrap();
//! println!("{} facets, height {:.2}", mesh.len(), bounds.extents().z);
//! ```

mod error;
mod mesh;
pub mod stl;

pub use error::{MeshError, Result};
pub use mesh::{Bounds, Mesh};
pub use stl::{parse_stl, read_stl, write_stl};
