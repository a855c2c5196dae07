#![warn(missing_docs)]

//! G-code output for the lamina slicer.
//!
//! This crate turns layers with ordered toolpaths into G-code for a
//! printer profile and firmware flavor.
//!
//! # Example
//!
//! ```ignore
//! use lamina_slicer::{slice, PrintSettings};
//! use lamina_slicer_gcode::{generate_gcode, GcodeSettings, PrinterProfile};
//!
//! let print = PrintSettings::default();
//! let layers = slice(&mesh, &print)?;
//!
//! let settings = GcodeSettings::new(PrinterProfile::prusa_mk4(), &print);
//! let gcode = generate_gcode(&layers, settings)?;
//! std::fs::write("output.gcode", gcode)?;
//! ```

pub mod error;
pub mod flavor;
pub mod gcode;
pub mod printer;

pub use error::{GcodeError, Result};
pub use flavor::{GcodeFlavor, Temperatures};
pub use gcode::{generate_gcode, write_gcode, GcodeGenerator, GcodeSettings};
pub use printer::PrinterProfile;
