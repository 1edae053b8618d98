//! Owned simulation state.
//!
//! Everything the step loop mutates lives in one [`SimulationState`] held
//! by [`Simulation`](crate::Simulation). Collaborators see it read-only.

use corona_core::{InvariantViolation, StepId};
use corona_grid::Geometry;
use corona_particles::ParticleContainer;

use crate::costs::Costs;
use crate::level::Level;

/// Clock of the level hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationTimeState {
    /// Physical time of the last completed step, s.
    pub cur_time: f64,
    /// Time each level has reached, s. Equal across levels after a step.
    pub t_new: Vec<f64>,
    /// Steps taken by each level.
    pub istep: Vec<StepId>,
    /// Step size of each level, s.
    pub dt: Vec<f64>,
    /// Whether momenta sit at the same time as positions. While false,
    /// momenta lag by half a step.
    pub is_synchronized: bool,
}

impl SimulationTimeState {
    /// Clock at time zero with steps `dt`.
    pub fn new(dt: Vec<f64>) -> Self {
        let n = dt.len();
        Self {
            cur_time: 0.0,
            t_new: vec![0.0; n],
            istep: vec![StepId::default(); n],
            dt,
            is_synchronized: true,
        }
    }

    /// Finest level index.
    pub fn finest_level(&self) -> usize {
        self.dt.len().saturating_sub(1)
    }

    /// Copy the level-0 time to every level.
    pub fn sync_t_new(&mut self) {
        let t = self.cur_time;
        self.t_new.iter_mut().for_each(|v| *v = t);
    }
}

/// Fields, particles and bookkeeping of one run.
#[derive(Clone, Debug)]
pub struct SimulationState {
    /// Clock.
    pub time: SimulationTimeState,
    /// Refinement levels, coarsest first.
    pub levels: Vec<Level>,
    /// One container per species.
    pub species: Vec<ParticleContainer>,
    /// Load-balance costs.
    pub costs: Costs,
}

impl SimulationState {
    /// Finest level index.
    pub fn finest_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Level `lev`.
    pub fn level(&self, lev: usize) -> Result<&Level, InvariantViolation> {
        self.levels.get(lev).ok_or(InvariantViolation::LevelOutOfRange {
            level: lev,
            finest: self.finest_level(),
        })
    }

    /// Fine-patch geometry of every level.
    pub fn geometries(&self) -> Vec<Geometry> {
        self.levels.iter().map(|l| l.geom().clone()).collect()
    }

    /// Particles over every species and level.
    pub fn num_particles(&self) -> usize {
        self.species.iter().map(ParticleContainer::num_particles).sum()
    }
}
