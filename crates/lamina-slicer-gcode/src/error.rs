//! Error types for G-code output.

use thiserror::Error;

/// Errors that can occur while writing G-code.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// There is nothing to print.
    #[error("no layers to write")]
    NoLayers,

    /// Writing to the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for G-code operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
