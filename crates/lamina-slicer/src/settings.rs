//! Print job parameters.

use lamina_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};

/// How the mesh is cut into per-layer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlicingStrategy {
    /// Sweep plane over triangles sorted by their lowest vertex.
    #[default]
    Sweep,
    /// Binary-search each triangle's heights into a side table.
    Match,
    /// Walk the half-edge graph; yields contours without linking.
    Topological,
}

/// How raw segments are joined into contours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// Hash rounded endpoints and follow partners.
    #[default]
    DictionaryLookup,
    /// Sort endpoints and scan neighbours for coincidence.
    DictionarySort,
    /// Quadratic adjacency scan.
    BruteForce,
}

/// Support fill pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportFill {
    /// Parallel lines at the support fill angle on every layer.
    Line,
    /// Lines rotated by 90° on odd layers.
    #[default]
    Cross,
}

/// Print job parameters.
///
/// Angles are in degrees, lengths in millimetres and feeds in mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintSettings {
    /// Layer thickness.
    pub layer_thickness: f64,
    /// Total wall thickness of the shell.
    pub shell_thickness: f64,
    /// Solid skin thickness at top and bottom faces.
    pub end_thickness: f64,
    /// Sparse infill density (0 to 1).
    pub sparse_fill_rate: f64,
    /// Infill direction on even layers.
    pub fill_angle: f64,
    /// Generate support structures.
    pub support_enabled: bool,
    /// Facets flatter than this from horizontal need support.
    pub support_critical_angle: f64,
    /// Support sampling grid size.
    pub support_grid: f64,
    /// Support fill density (0 to 1).
    pub support_fill_rate: f64,
    /// Support fill direction.
    pub support_fill_angle: f64,
    /// Support fill pattern.
    pub support_fill: SupportFill,
    /// Horizontal clearance between support and model.
    pub support_xy_gap: f64,
    /// Nozzle diameter, also the extrusion line width.
    pub nozzle_diameter: f64,
    /// Filament diameter.
    pub filament_diameter: f64,
    /// Feed for non-extruding moves.
    pub travel_feed: f64,
    /// Feed for extruding moves.
    pub print_feed: f64,
    /// Mesh cutting strategy.
    pub slicing: SlicingStrategy,
    /// Segment linking strategy.
    pub linking: LinkStrategy,
    /// Force-close short open contours after linking.
    pub heal_open_contours: bool,
    /// Hollow the model with this wall thickness.
    pub hollow_wall: Option<f64>,
    /// Tolerances used throughout the job.
    pub tolerance: Tolerance,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            layer_thickness: 0.2,
            shell_thickness: 2.0,
            end_thickness: 2.0,
            sparse_fill_rate: 0.2,
            fill_angle: 0.0,
            support_enabled: false,
            support_critical_angle: 60.0,
            support_grid: 2.0,
            support_fill_rate: 0.15,
            support_fill_angle: 0.0,
            support_fill: SupportFill::Cross,
            support_xy_gap: 1.0,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            travel_feed: 5000.0,
            print_feed: 1000.0,
            slicing: SlicingStrategy::Sweep,
            linking: LinkStrategy::DictionaryLookup,
            heal_open_contours: true,
            hollow_wall: None,
            tolerance: Tolerance::DEFAULT,
        }
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(SlicerError::InvalidSettings(format!(
            "{name} must be positive, got {v}"
        )))
    }
}

fn rate(name: &str, v: f64) -> Result<()> {
    if v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(SlicerError::InvalidSettings(format!(
            "{name} must be in (0, 1], got {v}"
        )))
    }
}

impl PrintSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        positive("layer_thickness", self.layer_thickness)?;
        if self.layer_thickness > 10.0 {
            return Err(SlicerError::InvalidSettings(
                "layer_thickness must be at most 10mm".into(),
            ));
        }
        positive("shell_thickness", self.shell_thickness)?;
        if !(self.end_thickness >= 0.0) {
            return Err(SlicerError::InvalidSettings(
                "end_thickness must not be negative".into(),
            ));
        }
        rate("sparse_fill_rate", self.sparse_fill_rate)?;
        rate("support_fill_rate", self.support_fill_rate)?;
        positive("support_grid", self.support_grid)?;
        if !(self.support_critical_angle > 0.0 && self.support_critical_angle <= 90.0) {
            return Err(SlicerError::InvalidSettings(
                "support_critical_angle must be in (0, 90] degrees".into(),
            ));
        }
        if !(self.support_xy_gap >= 0.0) {
            return Err(SlicerError::InvalidSettings(
                "support_xy_gap must not be negative".into(),
            ));
        }
        positive("nozzle_diameter", self.nozzle_diameter)?;
        positive("filament_diameter", self.filament_diameter)?;
        positive("travel_feed", self.travel_feed)?;
        positive("print_feed", self.print_feed)?;
        if let Some(wall) = self.hollow_wall {
            positive("hollow_wall", wall)?;
        }
        Ok(())
    }

    /// Number of layers that receive solid skin above or below an end face.
    pub fn end_layer_count(&self) -> usize {
        (self.end_thickness / self.layer_thickness).floor() as usize + 1
    }

    /// Spacing between sparse infill lines.
    pub fn sparse_fill_interval(&self) -> f64 {
        self.nozzle_diameter / self.sparse_fill_rate
    }

    /// Spacing between support fill lines.
    pub fn support_fill_interval(&self) -> f64 {
        self.nozzle_diameter / self.support_fill_rate
    }

    /// Infill angle for layer `index` in radians; odd layers turn by 90°.
    pub fn fill_angle_for(&self, index: usize) -> f64 {
        let delta = if index % 2 == 0 { 0.0 } else { 90.0 };
        (self.fill_angle + delta).to_radians()
    }

    /// Support fill angle for layer `index` in radians.
    pub fn support_angle_for(&self, index: usize) -> f64 {
        let delta = match self.support_fill {
            SupportFill::Cross if index % 2 == 1 => 90.0,
            _ => 0.0,
        };
        (self.support_fill_angle + delta).to_radians()
    }

    /// Filament length fed per millimetre of extruded path.
    pub fn e_per_mm(&self) -> f64 {
        let line_area = self.nozzle_diameter * self.layer_thickness;
        let filament_area = std::f64::consts::PI * (self.filament_diameter / 2.0).powi(2);
        line_area / filament_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let s = PrintSettings::default();
        s.validate().unwrap();
        assert_eq!(s.end_layer_count(), 11);
        assert!((s.sparse_fill_interval() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings() {
        let s = PrintSettings {
            layer_thickness: -0.1,
            ..Default::default()
        };
        assert!(s.validate().is_err());

        let s = PrintSettings {
            sparse_fill_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(SlicerError::InvalidSettings(_))));

        let s = PrintSettings {
            hollow_wall: Some(0.0),
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_angles_alternate() {
        let s = PrintSettings {
            fill_angle: 45.0,
            ..Default::default()
        };
        assert!((s.fill_angle_for(0) - 45f64.to_radians()).abs() < 1e-12);
        assert!((s.fill_angle_for(1) - 135f64.to_radians()).abs() < 1e-12);
        assert_eq!(s.support_angle_for(1), 90f64.to_radians());
        let line = PrintSettings {
            support_fill: SupportFill::Line,
            ..Default::default()
        };
        assert_eq!(line.support_angle_for(1), 0.0);
    }

    #[test]
    fn test_e_per_mm() {
        let s = PrintSettings::default();
        let expected = 0.4 * 0.2 / (std::f64::consts::PI * 0.875 * 0.875);
        assert!((s.e_per_mm() - expected).abs() < 1e-12);
    }
}
