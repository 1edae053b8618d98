//! Benchmark profiles for the Corona PIC framework.
//!
//! - [`reference_profile`]: 64x64 periodic electron-proton plasma, 4
//!   particles per cell per species, FDTD with Esirkepov deposition
//! - [`load_plasma`]: seeded particle loading into a built [`Simulation`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use corona_core::{InvariantViolation, StepError};
use corona_engine::{ConfigError, SimConfig, Simulation};
use corona_particles::Species;
use corona_test_utils::fixtures::{uniform_plasma, vacuum_xz};

/// Cells per side of the reference profile.
pub const REFERENCE_CELLS: usize = 64;

/// Particles per cell per species in the reference profile.
pub const REFERENCE_PPC: usize = 4;

/// Reference benchmark configuration: 64x64 cells of 1 µm, half the
/// Courant limit, default shape and deposition.
pub fn reference_profile() -> SimConfig {
    vacuum_xz(REFERENCE_CELLS, REFERENCE_CELLS, 1.0e-6)
}

/// Build a simulation from `cfg` with electrons and protons, each loaded
/// with `ppc` particles per cell of thermal spread `u_max`.
pub fn build(cfg: SimConfig, ppc: usize, u_max: f64, seed: u64) -> Result<Simulation, ProfileError> {
    let mut sim = Simulation::new(cfg, vec![Species::electron(), Species::proton()])
        .map_err(ProfileError::Config)?;
    load_plasma(&mut sim, ppc, u_max, seed).map_err(ProfileError::Invariant)?;
    Ok(sim)
}

/// Load a quasi-neutral plasma into species 0 and 1 of `sim`. Protons
/// are cold and sit on top of the electrons.
pub fn load_plasma(sim: &mut Simulation, ppc: usize, u_max: f64, seed: u64) -> Result<(), InvariantViolation> {
    let geom = sim.state().levels[0].geom().clone();
    for p in uniform_plasma(&geom, ppc, u_max, 1.0e6, seed) {
        let mut ion = p.clone();
        ion.u = [0.0; 3];
        sim.add_particle(0, p)?;
        sim.add_particle(1, ion)?;
    }
    Ok(())
}

/// Why a benchmark profile could not be built.
#[derive(Debug)]
pub enum ProfileError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// Particle loading failed.
    Invariant(InvariantViolation),
    /// A warm-up step failed.
    Step(StepError),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "profile config: {e}"),
            Self::Invariant(e) => write!(f, "profile particles: {e}"),
            Self::Step(e) => write!(f, "profile warm-up: {e}"),
        }
    }
}

impl std::error::Error for ProfileError {}

/// The reference profile, loaded and advanced `warmup` steps.
pub fn warmed_reference(warmup: u64, seed: u64) -> Result<Simulation, ProfileError> {
    let mut sim = build(reference_profile(), REFERENCE_PPC, 1.0e7, seed)?;
    sim.evolve(warmup).map_err(ProfileError::Step)?;
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_loads_both_species() {
        let mut cfg = reference_profile();
        cfg.grid.n_cells = [8, 1, 8];
        let sim = build(cfg, 2, 1.0e6, 3).unwrap();
        assert_eq!(sim.state().species[0].num_particles(), 128);
        assert_eq!(sim.state().species[1].num_particles(), 128);
    }
}
