//! Firmware dialects.

use serde::{Deserialize, Serialize};

/// Firmware the output is written for.
///
/// Flavors only differ in their start and end blocks; the motion commands
/// are plain `G0`/`G1` everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcodeFlavor {
    /// Home and nothing else; temperatures are left to the operator.
    Plain,
    /// Marlin (Ender, Prusa).
    #[default]
    Marlin,
    /// Klipper.
    Klipper,
    /// RepRapFirmware.
    RepRap,
}

/// Nozzle and bed temperatures substituted into start blocks (°C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperatures {
    /// Nozzle temperature.
    pub nozzle: u32,
    /// Bed temperature; 0 skips bed heating.
    pub bed: u32,
}

impl GcodeFlavor {
    /// Parse a flavor name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "plain" => Some(Self::Plain),
            "marlin" => Some(Self::Marlin),
            "klipper" => Some(Self::Klipper),
            "reprap" => Some(Self::RepRap),
            _ => None,
        }
    }

    /// Start block with temperatures filled in.
    pub fn start_block(&self, temps: Temperatures) -> String {
        let mut out = String::from("; Start code\n");
        if *self == Self::Plain {
            out.push_str("G28\n");
            return out;
        }
        out.push_str("G21 ; Millimetres\nG90 ; Absolute positioning\nM82 ; Absolute extrusion\n");
        if temps.bed > 0 {
            out.push_str(&format!("M140 S{}\n", temps.bed));
        }
        out.push_str(&format!("M104 S{}\n", temps.nozzle));
        out.push_str("G28 ; Home\n");
        match self {
            Self::Klipper => out.push_str("BED_MESH_CALIBRATE\n"),
            Self::RepRap => out.push_str("G29 S1 ; Load height map\n"),
            _ => {}
        }
        if temps.bed > 0 {
            out.push_str(&format!("M190 S{}\n", temps.bed));
        }
        out.push_str(&format!("M109 S{}\n", temps.nozzle));
        out.push_str("G92 E0\n");
        out
    }

    /// End block.
    pub fn end_block(&self) -> &'static str {
        match self {
            Self::Plain => "; End code\nM104 S0\n",
            Self::Klipper => "; End code\nTURN_OFF_HEATERS\nG91\nG1 Z10 F3000\nG90\nM84\n",
            Self::Marlin | Self::RepRap => {
                "; End code\nM104 S0\nM140 S0\nG91\nG1 Z10 F3000\nG90\nM84\n"
            }
        }
    }
}
