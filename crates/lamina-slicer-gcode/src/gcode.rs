//! Toolpaths to G-code.
//!
//! The first point of every path is reached with a `G0` that also sets Z.
//! A point whose predecessor carries the travel tag is reached with a
//! `G0`; every other point is a `G1` extruding `distance * e_per_mm`, with
//! E accumulated over the whole job.

use std::io::Write;

use lamina_geom::Polyline;
use lamina_slicer::{Layer, PrintSettings};
use tracing::{info, warn};

use crate::error::{GcodeError, Result};
use crate::printer::PrinterProfile;

/// Feeds and extrusion for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct GcodeSettings {
    /// Target machine.
    pub printer: PrinterProfile,
    /// Feed for `G0` moves (mm/min).
    pub travel_feed: f64,
    /// Feed for `G1` moves (mm/min).
    pub print_feed: f64,
    /// Filament fed per millimetre of extruded path.
    pub e_per_mm: f64,
}

impl GcodeSettings {
    /// Take feeds and extrusion from the print settings.
    pub fn new(printer: PrinterProfile, print: &PrintSettings) -> Self {
        Self {
            printer,
            travel_feed: print.travel_feed,
            print_feed: print.print_feed,
            e_per_mm: print.e_per_mm(),
        }
    }
}

impl Default for GcodeSettings {
    fn default() -> Self {
        Self::new(PrinterProfile::default(), &PrintSettings::default())
    }
}

/// Streaming G-code writer.
pub struct GcodeGenerator {
    settings: GcodeSettings,
    out: String,
    e: f64,
    outside: usize,
}

impl GcodeGenerator {
    /// Start a program with the flavor's start block.
    pub fn new(settings: GcodeSettings) -> Self {
        let out = settings.printer.flavor.start_block(settings.printer.temperatures());
        Self {
            settings,
            out,
            e: 0.0,
            outside: 0,
        }
    }

    /// Total filament fed so far.
    pub fn extruded(&self) -> f64 {
        self.e
    }

    /// Emit one layer: support outlines, support fill, shell, solid fill,
    /// sparse fill.
    pub fn layer(&mut self, index: usize, layer: &Layer) {
        self.out.push_str(&format!("; Layer {index} Z={:.3}\n", layer.z));
        for path in layer.paths_in_print_order() {
            self.path(path);
        }
    }

    /// Emit one path.
    pub fn path(&mut self, path: &Polyline) {
        let g0 = self.settings.travel_feed;
        let g1 = self.settings.print_feed;
        for (i, p) in path.points.iter().enumerate() {
            if !self.settings.printer.in_bounds(p.x, p.y, p.z) {
                self.outside += 1;
            }
            if i == 0 {
                self.out.push_str(&format!("G0 F{g0:.0} X{:.3} Y{:.3} Z{:.3}\n", p.x, p.y, p.z));
            } else if path.is_travel(i - 1) {
                self.out.push_str(&format!("G0 F{g0:.0} X{:.3} Y{:.3}\n", p.x, p.y));
            } else {
                self.e += (p - path.points[i - 1]).norm() * self.settings.e_per_mm;
                self.out
                    .push_str(&format!("G1 F{g1:.0} X{:.3} Y{:.3} E{:.5}\n", p.x, p.y, self.e));
            }
        }
    }

    /// Close the program with the flavor's end block.
    pub fn finish(mut self) -> String {
        if self.outside > 0 {
            warn!(
                points = self.outside,
                printer = %self.settings.printer.name,
                "Toolpath leaves the build volume"
            );
        }
        self.out.push_str(self.settings.printer.flavor.end_block());
        self.out
    }
}

/// Generate a complete program for `layers`.
pub fn generate_gcode(layers: &[Layer], settings: GcodeSettings) -> Result<String> {
    if layers.is_empty() {
        return Err(GcodeError::NoLayers);
    }
    let mut generator = GcodeGenerator::new(settings);
    for (i, layer) in layers.iter().enumerate() {
        generator.layer(i, layer);
    }
    let filament = generator.extruded();
    let code = generator.finish();
    info!(layers = layers.len(), filament_mm = filament, "Generated G-code");
    Ok(code)
}

/// Generate a program and write it out.
pub fn write_gcode<W: Write>(layers: &[Layer], settings: GcodeSettings, mut writer: W) -> Result<()> {
    let code = generate_gcode(layers, settings)?;
    writer.write_all(code.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lamina_math::Point3;

    fn plain() -> GcodeSettings {
        GcodeSettings {
            printer: PrinterProfile::plain(),
            travel_feed: 5000.0,
            print_feed: 1000.0,
            e_per_mm: 0.1,
        }
    }

    fn motion(code: &str) -> Vec<&str> {
        code.lines().filter(|l| l.starts_with('G') && !l.starts_with("G28")).collect()
    }

    #[test]
    fn test_path_moves() {
        let mut path = Polyline::new();
        path.push(Point3::new(0.0, 0.0, 0.2));
        path.push(Point3::new(10.0, 0.0, 0.2));
        path.push_tagged(Point3::new(10.0, 1.0, 0.2), true);
        path.push(Point3::new(0.0, 1.0, 0.2));

        let mut generator = GcodeGenerator::new(plain());
        generator.path(&path);
        assert_relative_eq!(generator.extruded(), 1.1, epsilon = 1e-12);
        let code = generator.finish();
        assert_eq!(
            motion(&code),
            vec![
                "G0 F5000 X0.000 Y0.000 Z0.200",
                "G1 F1000 X10.000 Y0.000 E1.00000",
                "G1 F1000 X10.000 Y1.000 E1.10000",
                "G0 F5000 X0.000 Y1.000",
            ]
        );
    }

    #[test]
    fn test_layers_and_blocks() {
        let mut layer = Layer::new(0.2);
        layer.shell_paths.push(Polyline::rectangle(0.0, 0.0, 10.0, 10.0, 0.2));
        layer.support_outline_paths.push(Polyline::rectangle(20.0, 20.0, 21.0, 21.0, 0.2));
        let code = generate_gcode(&[layer, Layer::new(0.4)], plain()).unwrap();

        assert!(code.starts_with("; Start code\nG28\n"));
        assert!(code.ends_with("; End code\nM104 S0\n"));
        assert!(code.contains("; Layer 0 Z=0.200\n"));
        assert!(code.contains("; Layer 1 Z=0.400\n"));
        // Support first, then the shell.
        let moves = motion(&code);
        assert_eq!(moves[0], "G0 F5000 X20.000 Y20.000 Z0.200");
        assert_eq!(moves[5], "G0 F5000 X0.000 Y0.000 Z0.200");
        assert!(moves.last().unwrap().ends_with("E4.40000"));
    }

    #[test]
    fn test_no_layers() {
        assert!(matches!(generate_gcode(&[], plain()), Err(GcodeError::NoLayers)));
    }

    #[test]
    fn test_settings_from_print() {
        let print = PrintSettings::default();
        let settings = GcodeSettings::new(PrinterProfile::generic(), &print);
        assert_eq!(settings.travel_feed, 5000.0);
        assert_eq!(settings.print_feed, 1000.0);
        assert_relative_eq!(settings.e_per_mm, print.e_per_mm());
    }

    #[test]
    fn test_write_gcode() {
        let mut layer = Layer::new(0.2);
        layer.sparse_paths.push(Polyline::rectangle(0.0, 0.0, 1.0, 1.0, 0.2));
        let mut buf = Vec::new();
        write_gcode(&[layer], plain(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(motion(&text).len(), 5);
    }
}
