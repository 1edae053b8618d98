//! Time-step orchestration for the Corona PIC framework.
//!
//! [`Simulation`] advances a hierarchy of at most two mesh levels by whole
//! steps. Each step picks one of four paths ([`StepPath`]): a lazy
//! electrostatic solve, the spectral multi-J loop, the plain
//! push/deposit/field-advance step, or a two-level step with a sub-cycled
//! fine patch. Around that it keeps momenta half a step behind positions,
//! moves the window, redistributes particles and applies boundaries.
//!
//! Everything outside the time advance (halo exchange, output, particle
//! boundaries, extra physics) goes through the traits in
//! [`collaborators`], each with a single-process default.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collaborators;
pub mod config;
pub mod costs;
pub mod evolve;
pub mod guard_cells;
pub mod level;
pub mod metrics;
pub mod mirrors;
pub mod moving_window;
pub mod state;

mod aux_fields;
mod field_advance;
mod multi_j;
mod pic_step;
mod subcycling;

pub use collaborators::{
    DefaultParticleBoundaries, Diagnostics, DomainDecomposition, LocalDecomposition,
    NoDiagnostics, NoPhysics, ParticleBoundary, PhysicsModules,
};
pub use config::{
    ConfigError, DepositionConfig, GridConfig, LoadBalanceConfig, Mirror, MirrorConfig,
    MovingWindowConfig, ParticleBoundaryConfig, PsatdConfig, RefinementConfig, SimConfig,
    SolverConfig, TimeConfig,
};
pub use costs::{CostMode, Costs};
pub use evolve::{check_compatibility, step_path, Simulation, StepPath};
pub use level::{Level, Patch, PatchSolver};
pub use metrics::StepMetrics;
pub use moving_window::WindowState;
pub use state::{SimulationState, SimulationTimeState};
