//! Corona: the time-advance core of an electromagnetic particle-in-cell
//! code.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Corona sub-crates. For most users, adding `corona` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use corona::prelude::*;
//!
//! // A 16x16 periodic xz box of 1 µm cells at half the Courant limit.
//! let mut config = SimConfig::default();
//! config.grid.n_cells = [16, 1, 16];
//! config.grid.dx = [1.0e-6; 3];
//! config.time.dt = 0.5 * 1.0e-6 / (corona::types::constants::C * 2f64.sqrt());
//!
//! let mut sim = Simulation::new(config, vec![Species::electron()]).unwrap();
//! sim.add_particle(
//!     0,
//!     ParticleData {
//!         id: -1,
//!         cpu: 0,
//!         pos: [8.0e-6, 0.0, 8.0e-6],
//!         u: [1.0e7, 0.0, 0.0],
//!         w: 1.0,
//!         runtime: Default::default(),
//!     },
//! )
//! .unwrap();
//!
//! sim.evolve(4).unwrap();
//! assert_eq!(sim.step(), 4);
//! assert!(sim.state().time.is_synchronized);
//! assert_eq!(sim.state().num_particles(), 1);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `corona-core` | Ids, field kinds, constants, error types |
//! | [`grid`] | `corona-grid` | Geometry, field arrays, halos, level transfers |
//! | [`particles`] | `corona-particles` | Species, tiles, push, gather, deposition |
//! | [`solver`] | `corona-solver` | FDTD, PSATD and electrostatic solvers |
//! | [`engine`] | `corona-engine` | Configuration and the step loop |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, constants, and errors (`corona-core`).
///
/// Contains [`types::FieldKind`], [`types::FieldSet`], [`types::StepId`]
/// and the error enums shared by every crate.
pub use corona_core as types;

/// Mesh geometry and field storage (`corona-grid`).
///
/// [`grid::Geometry`] describes a patch, [`grid::FieldArray`] stores one
/// staggered component with guard cells.
pub use corona_grid as grid;

/// Macro-particles (`corona-particles`).
///
/// [`particles::ParticleContainer`] holds one species per level in tiles;
/// the push, gather and deposition kernels operate on it.
pub use corona_particles as particles;

/// Field solvers (`corona-solver`).
///
/// [`solver::FdtdSolver`], [`solver::PsatdSolver`] and
/// [`solver::ElectrostaticSolver`] advance an [`solver::EmFields`] bundle.
pub use corona_solver as solver;

/// The time-advance loop (`corona-engine`).
///
/// [`engine::Simulation`] runs steps from an [`engine::SimConfig`] and
/// talks to the outside world through [`engine::collaborators`].
pub use corona_engine as engine;

/// Common imports for typical Corona usage.
///
/// ```rust
/// use corona::prelude::*;
/// ```
///
/// This imports the configuration types, the simulation loop and its
/// collaborator traits, species and particle data, and the error enums.
pub mod prelude {
    // Core types and errors
    pub use corona_core::{
        ConfigIncompatibility, FieldKind, FieldSet, InvariantViolation, StepError, StepId,
    };

    // Grid
    pub use corona_grid::{BoundaryKind, Dim, Geometry, IndexBox};

    // Particles
    pub use corona_particles::{
        CurrentAlgorithm, ParticleContainer, ParticleData, PusherKind, ShapeOrder, Species,
    };

    // Solvers
    pub use corona_solver::{FieldSolver, Medium};

    // Engine
    pub use corona_engine::{
        ConfigError, CostMode, Diagnostics, DomainDecomposition, Mirror, ParticleBoundary,
        PhysicsModules, SimConfig, Simulation, SimulationState, StepMetrics,
    };
}
