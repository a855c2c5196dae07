//! Build orientation search.
//!
//! Particle swarm over the rotation angles about X and Y, minimizing the
//! support volume of the rotated model.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};

use lamina_mesh::Mesh;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::support::SupportGrid;
use crate::{Result, SlicerError};

/// Swarm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientSettings {
    /// Number of particles.
    pub population: usize,
    /// Maximum number of iterations.
    pub iterations: usize,
    /// Probability that a particle jumps to a random orientation.
    pub mutation: f64,
    /// Pull towards the particle's own best.
    pub local_weight: f64,
    /// Pull towards the swarm's best.
    pub global_weight: f64,
    /// Support grid size (mm).
    pub grid_size: f64,
    /// Critical overhang angle (degrees).
    pub critical_angle: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for OrientSettings {
    fn default() -> Self {
        Self {
            population: 50,
            iterations: 30,
            mutation: 0.01,
            local_weight: 4.0,
            global_weight: 4.0,
            grid_size: 2.0,
            critical_angle: 60.0,
            seed: 0,
        }
    }
}

/// Best orientation found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Rotation about X (radians).
    pub a: f64,
    /// Rotation about Y (radians).
    pub b: f64,
    /// Support volume at this orientation (mm³).
    pub support_volume: f64,
    /// Iterations run.
    pub iterations: usize,
}

/// Support volume of `mesh` rotated by `a` about X and `b` about Y.
pub fn support_volume(mesh: &Mesh, a: f64, b: f64, grid_size: f64, critical_angle: f64) -> f64 {
    SupportGrid::build(&mesh.rotated(a, b, 0.0), grid_size)
        .map_or(0.0, |grid| grid.volume(critical_angle))
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    a: f64,
    b: f64,
    f: f64,
}

fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.gen::<f64>()
}

impl Particle {
    fn random(rng: &mut StdRng) -> Self {
        Self {
            a: uniform(rng, 0.0, TAU),
            b: uniform(rng, 0.0, TAU),
            f: f64::INFINITY,
        }
    }

    /// Occasionally jump to a new `a`; `b` is redrawn outside the range
    /// spanned by the three known `b`s when the new `a` falls inside theirs.
    fn vary(&mut self, rng: &mut StdRng, prob: f64, local: &Particle, global: &Particle) {
        if rng.gen::<f64>() >= prob {
            return;
        }
        let a = uniform(rng, 0.0, TAU);
        let a_lo = self.a.min(local.a).min(global.a);
        let a_hi = self.a.max(local.a).max(global.a);
        if a < a_lo || a > a_hi {
            self.b = uniform(rng, 0.0, TAU);
        } else if rng.gen::<f64>() < 0.5 {
            self.b = uniform(rng, 0.0, self.b.min(local.b).min(global.b));
        } else {
            self.b = uniform(rng, self.b.max(local.b).max(global.b), TAU);
        }
        self.a = a;
    }

    /// Move to a random convex combination of the current position and the
    /// two bests.
    fn evolve(&mut self, rng: &mut StdRng, local: &Particle, global: &Particle, wl: f64, wg: f64) {
        let (r1, r2, r3) = (rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>());
        let sum = r1 + wl * r2 + wg * r3;
        if sum <= 0.0 {
            return;
        }
        let (p, q, r) = (r1 / sum, wl * r2 / sum, wg * r3 / sum);
        self.a = p * self.a + q * local.a + r * global.a;
        self.b = p * self.b + q * local.b + r * global.b;
    }
}

/// Search the orientation with the least support volume.
///
/// `cancel` is checked once per iteration; setting it aborts the search
/// with [`SlicerError::Cancelled`].
pub fn optimize_orientation(mesh: &Mesh, settings: &OrientSettings, cancel: Option<&AtomicBool>) -> Result<Orientation> {
    if mesh.is_empty() {
        return Err(SlicerError::EmptyMesh);
    }
    if settings.population == 0 || settings.grid_size <= 0.0 {
        return Err(SlicerError::InvalidSettings(
            "orientation search needs a population and a positive grid size".into(),
        ));
    }
    let critical = settings.critical_angle.to_radians();
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut swarm: Vec<Particle> = (0..settings.population).map(|_| Particle::random(&mut rng)).collect();
    let mut local = swarm.clone();
    let mut global = Particle::random(&mut rng);
    let mut run = 0;

    info!(
        population = settings.population,
        iterations = settings.iterations,
        "Searching build orientation"
    );
    for k in 0..settings.iterations {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            return Err(SlicerError::Cancelled);
        }
        run = k + 1;
        swarm.par_iter_mut().for_each(|p| {
            p.f = support_volume(mesh, p.a, p.b, settings.grid_size, critical);
        });
        for (p, best) in swarm.iter().zip(local.iter_mut()) {
            if p.f < best.f {
                *best = *p;
            }
            if p.f < global.f {
                global = *p;
            }
        }
        for (p, best) in swarm.iter_mut().zip(&local) {
            p.vary(&mut rng, settings.mutation, best, &global);
            p.evolve(&mut rng, best, &global, settings.local_weight, settings.global_weight);
        }
        debug!(iteration = run, best = global.f, "Swarm iteration");
        if global.f < 1.0 {
            break;
        }
    }

    info!(a = global.a, b = global.b, volume = global.f, "Orientation found");
    Ok(Orientation {
        a: global.a,
        b: global.b,
        support_volume: global.f,
        iterations: run,
    })
}
