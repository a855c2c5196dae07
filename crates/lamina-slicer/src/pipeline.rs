//! Print job state machine.
//!
//! A [`Pipeline`] owns the layers of one job and moves them through
//! [`Stage`]s in a fixed order. Each transition checks that the previous
//! stage has run and returns [`SlicerError::StageOrder`] otherwise.

use std::fmt;

use lamina_geom::Polyline;
use lamina_math::Point3;
use lamina_mesh::Mesh;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::endfaces::id_end_layers;
use crate::fill::gen_dp_path;
use crate::hollow::hollow_layers;
use crate::layer::Layer;
use crate::link::{clean_layers, link_layers, LinkReport};
use crate::settings::PrintSettings;
use crate::shell::gen_cp_path;
use crate::slice::slice_mesh;
use crate::support::{find_support_regions, gen_support_paths};
use crate::{Result, SlicerError};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing has run yet.
    Created,
    /// Layers hold raw segments (or walked contours).
    Sliced,
    /// Layers hold closed, cleaned, oriented contours.
    Linked,
    /// Shell, solid and sparse regions are known.
    ShellSplit,
    /// Support regions are known (empty when support is disabled).
    SupportComputed,
    /// Every region has its toolpaths.
    PathGenerated,
    /// Toolpaths are ordered for printing.
    PathLinked,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::Sliced => "sliced",
            Stage::Linked => "linked",
            Stage::ShellSplit => "shell-split",
            Stage::SupportComputed => "support-computed",
            Stage::PathGenerated => "path-generated",
            Stage::PathLinked => "path-linked",
        };
        f.write_str(name)
    }
}

/// One print job.
#[derive(Debug)]
pub struct Pipeline<'m> {
    mesh: &'m Mesh,
    settings: PrintSettings,
    layers: Vec<Layer>,
    stage: Stage,
    report: LinkReport,
}

impl<'m> Pipeline<'m> {
    /// Start a job. Settings are validated here.
    pub fn new(mesh: &'m Mesh, settings: PrintSettings) -> Result<Self> {
        settings.validate()?;
        if mesh.is_empty() {
            return Err(SlicerError::EmptyMesh);
        }
        Ok(Self {
            mesh,
            settings,
            layers: Vec::new(),
            stage: Stage::Created,
            report: LinkReport::default(),
        })
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Job settings.
    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    /// Layers in ascending Z.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Take the layers out of the job.
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    /// Linking totals, filled by [`Pipeline::link`].
    pub fn link_report(&self) -> LinkReport {
        self.report
    }

    fn enter(&mut self, expected: Stage, next: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(SlicerError::StageOrder {
                expected,
                found: self.stage,
            });
        }
        self.stage = next;
        Ok(())
    }

    /// Cut the mesh into layers.
    pub fn slice(&mut self) -> Result<&mut Self> {
        self.enter(Stage::Created, Stage::Sliced)?;
        self.layers = slice_mesh(self.mesh, self.settings.layer_thickness, self.settings.slicing);
        Ok(self)
    }

    /// Link segments into contours, heal, clean and optionally hollow.
    pub fn link(&mut self) -> Result<&mut Self> {
        self.enter(Stage::Sliced, Stage::Linked)?;
        let tol = self.settings.tolerance;
        self.report = link_layers(
            &mut self.layers,
            self.settings.linking,
            self.settings.heal_open_contours,
            &tol,
        );
        clean_layers(&mut self.layers, tol.clean_precision);
        if let Some(wall) = self.settings.hollow_wall {
            let bounds = self.mesh.bounds().ok_or(SlicerError::EmptyMesh)?;
            info!(wall, "Hollowing layers");
            self.layers = hollow_layers(&self.layers, wall, bounds.min.z, bounds.max.z, &tol);
        }
        Ok(self)
    }

    /// Split every layer into shell, solid and sparse regions.
    pub fn split_shells(&mut self) -> Result<&mut Self> {
        self.enter(Stage::Linked, Stage::ShellSplit)?;
        let tol = self.settings.tolerance;
        id_end_layers(
            &mut self.layers,
            self.settings.shell_thickness,
            self.settings.end_layer_count(),
            &tol,
        );
        Ok(self)
    }

    /// Find support regions; a no-op when support is disabled.
    pub fn compute_support(&mut self) -> Result<&mut Self> {
        self.enter(Stage::ShellSplit, Stage::SupportComputed)?;
        if self.settings.support_enabled {
            find_support_regions(self.mesh, &mut self.layers, &self.settings);
        } else {
            debug!("Support disabled");
        }
        Ok(self)
    }

    /// Generate shell, fill and support toolpaths.
    pub fn generate_paths(&mut self) -> Result<&mut Self> {
        self.enter(Stage::SupportComputed, Stage::PathGenerated)?;
        let settings = &self.settings;
        let tol = settings.tolerance;
        let nozzle = settings.nozzle_diameter;
        let sparse_interval = settings.sparse_fill_interval();

        self.layers.par_iter_mut().enumerate().for_each(|(i, layer)| {
            let angle = settings.fill_angle_for(i);
            layer.shell_paths = gen_cp_path(&layer.contours, nozzle, settings.shell_thickness);
            layer.solid_paths = gen_dp_path(&layer.solid_contours, nozzle, angle, &tol);
            layer.sparse_paths = gen_dp_path(&layer.sparse_contours, sparse_interval, angle, &tol);
        });
        if settings.support_enabled {
            gen_support_paths(self.mesh, &mut self.layers, settings, &tol);
        }

        let paths: usize = self.layers.iter().map(Layer::path_count).sum();
        info!(layers = self.layers.len(), paths, "Generated toolpaths");
        Ok(self)
    }

    /// Order each layer's paths to shorten travel.
    pub fn link_paths(&mut self) -> Result<&mut Self> {
        self.enter(Stage::PathGenerated, Stage::PathLinked)?;
        self.layers.par_iter_mut().for_each(order_layer_paths);
        Ok(self)
    }

    /// Run every remaining stage.
    pub fn run(&mut self) -> Result<&mut Self> {
        if self.stage < Stage::Sliced {
            self.slice()?;
        }
        if self.stage < Stage::Linked {
            self.link()?;
        }
        if self.stage < Stage::ShellSplit {
            self.split_shells()?;
        }
        if self.stage < Stage::SupportComputed {
            self.compute_support()?;
        }
        if self.stage < Stage::PathGenerated {
            self.generate_paths()?;
        }
        if self.stage < Stage::PathLinked {
            self.link_paths()?;
        }
        Ok(self)
    }
}

/// Reorder every path group of `layer` nearest-start-first, carrying the
/// nozzle position from one group into the next.
pub fn order_layer_paths(layer: &mut Layer) {
    let mut at = Point3::new(0.0, 0.0, layer.z);
    for group in [
        &mut layer.support_outline_paths,
        &mut layer.support_fill_paths,
        &mut layer.shell_paths,
        &mut layer.solid_paths,
        &mut layer.sparse_paths,
    ] {
        at = order_paths(group, at);
    }
}

/// Greedy nearest-neighbour ordering of `paths` starting from `from`.
///
/// Returns the end of the last path, or `from` when `paths` is empty.
pub fn order_paths(paths: &mut Vec<Polyline>, from: Point3) -> Point3 {
    let mut remaining = std::mem::take(paths);
    let mut at = from;
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| distance_to(a, &at).total_cmp(&distance_to(b, &at)))
            .map_or(0, |(k, _)| k);
        let path = remaining.swap_remove(next);
        if let Some(end) = path.end() {
            at = *end;
        }
        paths.push(path);
    }
    at
}

fn distance_to(path: &Polyline, at: &Point3) -> f64 {
    path.start().map_or(f64::MAX, |p| (p.xy() - at.xy()).norm_squared())
}
