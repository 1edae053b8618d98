//! Error types for the Corona PIC framework.
//!
//! Every error in the time-advance core is fatal: the orchestrator stops,
//! logs the violated precondition, and refuses further steps. Errors are
//! split into two classes: configuration incompatibilities detected at the
//! start of a one-step routine, and invariant violations detected while a
//! stage runs.

use std::error::Error;
use std::fmt;

use crate::field::FieldKind;

/// An unsupported combination of algorithms.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigIncompatibility {
    /// Subcycling requires exactly two refinement levels.
    SubcyclingLevels {
        /// Number of levels configured.
        levels: usize,
    },
    /// Subcycling cannot be combined with the electrostatic solver.
    SubcyclingElectrostatic,
    /// Subcycling requires a refinement ratio of 2.
    SubcyclingRefRatio {
        /// The configured ratio.
        ratio: usize,
    },
    /// Subcycling splits the field advance into leapfrog halves and is only
    /// defined for the finite-difference solver.
    SubcyclingSpectral,
    /// Multi-J deposition requires the spectral solver.
    MultiJNonSpectral,
    /// A charge-conserving deposition was combined with a Galilean drift.
    ChargeConservingWithGalilean {
        /// Name of the deposition algorithm.
        algorithm: &'static str,
    },
    /// A charge-conserving deposition was evaluated away from the half step.
    ChargeConservingRelativeTime {
        /// Name of the deposition algorithm.
        algorithm: &'static str,
        /// Requested relative time, s.
        relative_time: f64,
        /// Deposition time step, s.
        dt: f64,
    },
    /// Vay deposition requires the spectral solver.
    VayWithoutSpectral,
    /// Current correction and Esirkepov deposition cannot run on the same step.
    CurrentCorrectionWithEsirkepov,
    /// Current correction is a spectral-space projection.
    CurrentCorrectionNonSpectral,
}

impl fmt::Display for ConfigIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubcyclingLevels { levels } => {
                write!(f, "subcycling requires exactly 2 levels, got {levels}")
            }
            Self::SubcyclingElectrostatic => {
                write!(f, "subcycling is not supported with the electrostatic solver")
            }
            Self::SubcyclingRefRatio { ratio } => {
                write!(f, "subcycling requires a refinement ratio of 2, got {ratio}")
            }
            Self::SubcyclingSpectral => {
                write!(f, "subcycling is only implemented for the FDTD solver")
            }
            Self::MultiJNonSpectral => write!(f, "multi-J deposition requires the PSATD solver"),
            Self::ChargeConservingWithGalilean { algorithm } => {
                write!(f, "{algorithm} deposition is not supported with a Galilean drift")
            }
            Self::ChargeConservingRelativeTime {
                algorithm,
                relative_time,
                dt,
            } => write!(
                f,
                "{algorithm} deposition requires relative time -0.5*dt ({}), got {relative_time}",
                -0.5 * dt
            ),
            Self::VayWithoutSpectral => write!(f, "Vay deposition requires the PSATD solver"),
            Self::CurrentCorrectionWithEsirkepov => {
                write!(f, "current correction cannot be combined with Esirkepov deposition")
            }
            Self::CurrentCorrectionNonSpectral => {
                write!(f, "current correction requires the PSATD solver")
            }
        }
    }
}

impl Error for ConfigIncompatibility {}

/// A broken runtime invariant.
#[derive(Clone, Debug, PartialEq)]
pub enum InvariantViolation {
    /// A particle sits further outside its patch than the guard cells allow.
    ParticleOutsideGuard {
        /// Mesh level of the particle.
        level: usize,
        /// Distance outside the valid box, in cells.
        excursion: f64,
        /// Maximum allowed distance, `ng - order/2`.
        allowed: f64,
    },
    /// A stage read guard cells wider than the last fill produced.
    GuardCellsStale {
        /// The field whose guards were read.
        field: FieldKind,
        /// Width the stage needs.
        required: usize,
        /// Width the last fill produced.
        valid: usize,
    },
    /// A medium/solver pairing reached a dispatch point that has no kernel.
    UnsupportedMedium {
        /// Solver name.
        solver: &'static str,
        /// Medium name.
        medium: &'static str,
    },
    /// A level index beyond the finest level.
    LevelOutOfRange {
        /// The requested level.
        level: usize,
        /// The finest level present.
        finest: usize,
    },
    /// Two arrays that must share a layout do not.
    ShapeMismatch {
        /// Expected valid extent.
        expected: [usize; 3],
        /// Found valid extent.
        found: [usize; 3],
    },
    /// A deposit landed outside the allocated storage of its target.
    DepositOutsideStorage {
        /// The grid index of the dropped contribution.
        index: [i64; 3],
    },
    /// A species index beyond the registered species.
    UnknownSpecies {
        /// The requested index.
        index: usize,
        /// Number of registered species.
        count: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParticleOutsideGuard {
                level,
                excursion,
                allowed,
            } => write!(
                f,
                "particle on level {level} is {excursion} cells outside its patch, \
                 guard allowance is {allowed}"
            ),
            Self::GuardCellsStale {
                field,
                required,
                valid,
            } => write!(
                f,
                "{field} guard cells read at width {required} but only {valid} are valid"
            ),
            Self::UnsupportedMedium { solver, medium } => {
                write!(f, "{solver} solver does not support the {medium} medium")
            }
            Self::LevelOutOfRange { level, finest } => {
                write!(f, "level {level} out of range (finest level is {finest})")
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "array shape mismatch: expected {expected:?}, found {found:?}")
            }
            Self::DepositOutsideStorage { index } => {
                write!(f, "deposit at {index:?} falls outside the allocated grid")
            }
            Self::UnknownSpecies { index, count } => {
                write!(f, "species {index} does not exist ({count} registered)")
            }
        }
    }
}

impl Error for InvariantViolation {}

/// Errors from one step of the time-advance loop.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// The configured algorithms cannot run together.
    Config(ConfigIncompatibility),
    /// A stage found a broken invariant.
    Invariant(InvariantViolation),
    /// A previous step failed and the simulation refuses to continue.
    Aborted,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "incompatible configuration: {e}"),
            Self::Invariant(e) => write!(f, "invariant violated: {e}"),
            Self::Aborted => write!(f, "simulation aborted by an earlier fatal error"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Invariant(e) => Some(e),
            Self::Aborted => None,
        }
    }
}

impl From<ConfigIncompatibility> for StepError {
    fn from(e: ConfigIncompatibility) -> Self {
        Self::Config(e)
    }
}

impl From<InvariantViolation> for StepError {
    fn from(e: InvariantViolation) -> Self {
        Self::Invariant(e)
    }
}
