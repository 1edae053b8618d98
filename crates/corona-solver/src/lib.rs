//! Field solvers for the Corona PIC framework.
//!
//! A patch's fields live in an [`EmFields`] bundle. Three solvers advance
//! them:
//!
//! - [`fdtd`]: the Yee leapfrog, split into half-step B updates around a
//!   full E update, with optional F/G divergence cleaning and a uniform
//!   [`Medium`].
//! - [`psatd`]: the analytic spectral update, exact per Fourier mode for
//!   currents constant or linear in time, with current correction and Vay
//!   current reconstruction.
//! - [`electrostatic`]: a periodic FFT Poisson solve for E from rho.
//!
//! [`FieldSolver`] names the configured algorithm.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod electrostatic;
pub mod error;
pub mod fdtd;
pub mod fields;
pub mod medium;
pub mod psatd;

pub use electrostatic::ElectrostaticSolver;
pub use error::SolverError;
pub use fdtd::FdtdSolver;
pub use fields::{EmFields, FieldOptions};
pub use medium::Medium;
pub use psatd::{PsatdConfig, PsatdSolver, SpectralSlot};

/// The configured field-advance algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldSolver {
    /// Yee finite-difference leapfrog.
    #[default]
    Fdtd,
    /// Pseudo-spectral analytical time domain.
    Psatd,
    /// Electrostatic Poisson solve; no field advance.
    Electrostatic,
    /// Fields are never advanced.
    None,
}

impl FieldSolver {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Fdtd => "FDTD",
            Self::Psatd => "PSATD",
            Self::Electrostatic => "electrostatic",
            Self::None => "none",
        }
    }

    /// Whether the solver works in Fourier space.
    pub fn is_spectral(self) -> bool {
        matches!(self, Self::Psatd)
    }
}
