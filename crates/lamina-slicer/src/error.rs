//! Error types for the slicer.

use lamina_mesh::MeshError;
use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that can occur during slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid print settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The Boolean kernel rejected its input.
    #[error("polygon clipping failed: {0}")]
    Clip(String),

    /// A stage failed on one layer.
    #[error("layer at z={0:.4} failed: {1}")]
    LayerFailed(f64, String),

    /// Malformed layer file.
    #[error("invalid SLC data: {0}")]
    Format(String),

    /// A pipeline stage was run out of order.
    #[error("pipeline is {found}, expected {expected}")]
    StageOrder {
        /// Stage the transition requires.
        expected: Stage,
        /// Stage the pipeline was in.
        found: Stage,
    },

    /// A long-running search was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Mesh loading failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
