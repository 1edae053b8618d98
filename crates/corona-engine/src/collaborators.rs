//! Narrow interfaces to everything outside the time-advance core.
//!
//! The step loop calls these at fixed points and never inspects how they
//! work. Each trait ships with a default that is enough for a
//! single-process run: [`LocalDecomposition`], [`NoDiagnostics`],
//! [`DefaultParticleBoundaries`] and [`NoPhysics`].

use corona_core::InvariantViolation;
use corona_grid::{halo, FieldArray, Geometry};
use corona_particles::{ParticleBoundaries, ParticleContainer};

use crate::config::ParticleBoundaryConfig;
use crate::costs::Costs;
use crate::state::{SimulationState, SimulationTimeState};

// ── DomainDecomposition ────────────────────────────────────────────

/// Halo exchange, reductions and repartitioning.
///
/// All calls are blocking. `fill_boundary` must leave
/// `a.guard_valid() >= w` (clamped to the allocated width).
pub trait DomainDecomposition: Send {
    /// Fill the guard cells of `a` to width `w`.
    fn fill_boundary(&self, a: &mut FieldArray, w: usize, periodic: [bool; 3]);

    /// Fold deposited guard contributions into the valid cells they alias.
    fn sum_boundary(&self, a: &mut FieldArray, periodic: [bool; 3]);

    /// Global sum of a local value.
    fn reduce_sum(&self, local: f64) -> f64;

    /// Global maximum of a local value.
    fn reduce_max(&self, local: f64) -> f64;

    /// Rebalance ownership from `costs`. Returns `true` if the layout
    /// changed and particles must be fully redistributed.
    fn repartition(&mut self, costs: &Costs) -> bool;
}

/// A single process owning the whole domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDecomposition;

impl DomainDecomposition for LocalDecomposition {
    fn fill_boundary(&self, a: &mut FieldArray, w: usize, periodic: [bool; 3]) {
        halo::fill_boundary(a, w, periodic);
    }

    fn sum_boundary(&self, a: &mut FieldArray, periodic: [bool; 3]) {
        halo::sum_boundary(a, periodic);
    }

    fn reduce_sum(&self, local: f64) -> f64 {
        local
    }

    fn reduce_max(&self, local: f64) -> f64 {
        local
    }

    fn repartition(&mut self, _costs: &Costs) -> bool {
        false
    }
}

// ── Diagnostics ────────────────────────────────────────────────────

/// Output hooks.
pub trait Diagnostics: Send {
    /// Called first thing in every step.
    fn new_iteration(&mut self, step: u64, time: f64);

    /// Called at the end of every step with the advanced state.
    fn compute_and_flush(&mut self, state: &SimulationState);

    /// Called once when the loop exits.
    fn flush_last(&mut self, state: &SimulationState);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn new_iteration(&mut self, _step: u64, _time: f64) {}

    fn compute_and_flush(&mut self, _state: &SimulationState) {}

    fn flush_last(&mut self, _state: &SimulationState) {}
}

// ── ParticleBoundary ───────────────────────────────────────────────

/// Resolves particles that left the domain.
pub trait ParticleBoundary: Send {
    /// Apply the boundary to level `lev` of `container` against the
    /// level-0 domain. Lost particles are compacted away. Returns the
    /// number lost.
    fn apply(
        &self,
        container: &mut ParticleContainer,
        lev: usize,
        domain: &Geometry,
    ) -> Result<usize, InvariantViolation>;
}

/// Per-face periodic, absorbing or reflecting boundaries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefaultParticleBoundaries(pub ParticleBoundaries);

impl From<&ParticleBoundaryConfig> for DefaultParticleBoundaries {
    fn from(cfg: &ParticleBoundaryConfig) -> Self {
        Self(ParticleBoundaries {
            lo: cfg.lo,
            hi: cfg.hi,
        })
    }
}

impl ParticleBoundary for DefaultParticleBoundaries {
    fn apply(
        &self,
        container: &mut ParticleContainer,
        lev: usize,
        domain: &Geometry,
    ) -> Result<usize, InvariantViolation> {
        self.0.apply(container, lev, domain)
    }
}

// ── PhysicsModules ─────────────────────────────────────────────────

/// Optional particle physics run between the guard fill and the push.
///
/// Every hook defaults to doing nothing.
pub trait PhysicsModules: Send {
    /// Field ionization.
    fn ionize(&mut self, _species: &mut [ParticleContainer], _time: &SimulationTimeState) {}

    /// Binary collisions.
    fn collide(&mut self, _species: &mut [ParticleContainer], _time: &SimulationTimeState) {}

    /// QED pair creation and photon emission.
    fn qed_events(&mut self, _species: &mut [ParticleContainer], _time: &SimulationTimeState) {}

    /// Macro-particle merging and splitting after the push.
    fn resample(&mut self, _species: &mut [ParticleContainer], _time: &SimulationTimeState) {}
}

/// No extra physics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPhysics;

impl PhysicsModules for NoPhysics {}
