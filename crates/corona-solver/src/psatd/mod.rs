//! Pseudo-spectral analytical time-domain (PSATD) field advance.
//!
//! Fields are transformed to Fourier space, advanced there with the exact
//! solution of Maxwell's equations for sources constant (or linear) over
//! the step, and transformed back. The steps are exposed individually so
//! that the multi-J loop can interleave deposition with spectral pushes;
//! [`PsatdSolver::advance`] runs the plain single-deposition sequence.

mod algorithm;
pub mod coefficients;
mod correction;
pub mod fft;
pub mod kspace;

pub use algorithm::PsatdSolver;
pub use coefficients::{mode_coefficients, ModeCoefficients, SpectralCoefficients};
pub use fft::{SpectralField, SpectralTransform};
pub use kspace::KSpace;

/// Options of the spectral update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsatdConfig {
    /// Use the deposited old and new rho in the E update. Otherwise rho is
    /// reconstructed from Gauss's law and continuity.
    pub update_with_rho: bool,
    /// Treat J as linear in time between the old and new current slots.
    pub j_linear: bool,
    /// Evolve the electric cleaning scalar F.
    pub div_e_cleaning: bool,
    /// Evolve the magnetic cleaning scalar G.
    pub div_b_cleaning: bool,
    /// Project J so that it satisfies continuity with the deposited rho.
    pub current_correction: bool,
    /// The current arrays hold Vay `D` components instead of J.
    pub vay_deposition: bool,
    /// Accumulate time-averaged E and B.
    pub time_averaging: bool,
}

impl PsatdConfig {
    /// Whether the push reads the spectral charge density.
    pub fn needs_rho(&self) -> bool {
        self.update_with_rho || self.current_correction
    }
}

/// A time slot of spectral J or rho.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpectralSlot {
    /// Start of the step.
    Old,
    /// End of the step.
    New,
}

impl SpectralSlot {
    /// Storage index (0 old, 1 new).
    pub fn index(self) -> usize {
        match self {
            Self::Old => 0,
            Self::New => 1,
        }
    }
}
