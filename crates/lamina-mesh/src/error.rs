//! Error types for mesh ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or writing a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh file does not exist.
    #[error("mesh file not found: {}", path.display())]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The content is neither valid ASCII nor binary STL.
    #[error("invalid STL content: {0}")]
    InvalidContent(String),

    /// A binary STL ended before its declared facet count.
    #[error("truncated binary STL: expected {expected} facets, got {got}")]
    Truncated {
        /// Facets declared in the header.
        expected: u32,
        /// Facets actually present.
        got: u32,
    },

    /// Every facet was rejected or the file held none.
    #[error("no valid triangles in mesh")]
    NoValidTriangles,

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
