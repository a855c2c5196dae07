//! Printer profiles.

use lamina_slicer::PrintSettings;
use serde::{Deserialize, Serialize};

use crate::flavor::{GcodeFlavor, Temperatures};

/// Machine description used when writing G-code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterProfile {
    /// Profile name.
    pub name: String,
    /// Firmware dialect.
    pub flavor: GcodeFlavor,
    /// Build volume (mm).
    pub build_volume: [f64; 3],
    /// Nozzle diameter (mm).
    pub nozzle_diameter: f64,
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Nozzle temperature (°C).
    pub nozzle_temp: u32,
    /// Bed temperature (°C); 0 for an unheated bed.
    pub bed_temp: u32,
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl PrinterProfile {
    /// Generic Marlin machine.
    pub fn generic() -> Self {
        Self {
            name: "generic".into(),
            flavor: GcodeFlavor::Marlin,
            build_volume: [220.0, 220.0, 250.0],
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            nozzle_temp: 210,
            bed_temp: 60,
        }
    }

    /// Creality Ender 3.
    pub fn ender3() -> Self {
        Self {
            name: "ender3".into(),
            nozzle_temp: 200,
            ..Self::generic()
        }
    }

    /// Prusa MK4.
    pub fn prusa_mk4() -> Self {
        Self {
            name: "prusa_mk4".into(),
            build_volume: [250.0, 210.0, 220.0],
            nozzle_temp: 215,
            ..Self::generic()
        }
    }

    /// Voron 2.4, 350 mm.
    pub fn voron_24() -> Self {
        Self {
            name: "voron_24".into(),
            flavor: GcodeFlavor::Klipper,
            build_volume: [350.0, 350.0, 340.0],
            nozzle_temp: 240,
            bed_temp: 110,
            ..Self::generic()
        }
    }

    /// Unheated machine with the minimal start block.
    pub fn plain() -> Self {
        Self {
            name: "plain".into(),
            flavor: GcodeFlavor::Plain,
            bed_temp: 0,
            ..Self::generic()
        }
    }

    /// All built-in profiles.
    pub fn all_profiles() -> Vec<Self> {
        vec![
            Self::generic(),
            Self::ender3(),
            Self::prusa_mk4(),
            Self::voron_24(),
            Self::plain(),
        ]
    }

    /// Look up a built-in profile by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::all_profiles().into_iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Temperatures for the start block.
    pub fn temperatures(&self) -> Temperatures {
        Temperatures {
            nozzle: self.nozzle_temp,
            bed: self.bed_temp,
        }
    }

    /// Copy the machine's nozzle and filament into `settings`.
    pub fn apply_to(&self, settings: &mut PrintSettings) {
        settings.nozzle_diameter = self.nozzle_diameter;
        settings.filament_diameter = self.filament_diameter;
    }

    /// Check if a position is within the build volume.
    pub fn in_bounds(&self, x: f64, y: f64, z: f64) -> bool {
        let [bx, by, bz] = self.build_volume;
        (0.0..=bx).contains(&x) && (0.0..=by).contains(&y) && (0.0..=bz).contains(&z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        for profile in PrinterProfile::all_profiles() {
            assert!(profile.build_volume.iter().all(|&v| v > 0.0));
            assert!(profile.nozzle_diameter > 0.0);
            assert_eq!(PrinterProfile::by_name(&profile.name), Some(profile));
        }
        assert!(PrinterProfile::by_name("nope").is_none());
    }

    #[test]
    fn test_in_bounds() {
        let profile = PrinterProfile::prusa_mk4();
        assert!(profile.in_bounds(100.0, 100.0, 100.0));
        assert!(!profile.in_bounds(-1.0, 100.0, 100.0));
        assert!(!profile.in_bounds(100.0, 220.0, 100.0));
    }

    #[test]
    fn test_apply_to_settings() {
        let mut settings = PrintSettings::default();
        let profile = PrinterProfile {
            nozzle_diameter: 0.6,
            filament_diameter: 2.85,
            ..PrinterProfile::generic()
        };
        profile.apply_to(&mut settings);
        assert_eq!(settings.nozzle_diameter, 0.6);
        assert_eq!(settings.filament_diameter, 2.85);
    }
}
