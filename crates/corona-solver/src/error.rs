//! Errors raised while building solvers.

use std::error::Error;
use std::fmt;

use corona_core::FieldKind;

/// A solver that cannot be built for the requested patch.
#[derive(Clone, Debug, PartialEq)]
pub enum SolverError {
    /// The Poisson solve needs every active axis periodic.
    NonPeriodicPoisson {
        /// First non-periodic axis.
        axis: usize,
    },
    /// The time step must be finite and positive.
    InvalidTimeStep {
        /// The rejected value.
        dt: f64,
    },
    /// A field the configuration requires was not allocated.
    MissingField {
        /// The absent field.
        field: FieldKind,
    },
    /// Medium parameters must be finite and positive (sigma may be zero).
    InvalidMedium {
        /// Which parameter.
        parameter: &'static str,
        /// Its value.
        value: f64,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPeriodicPoisson { axis } => {
                write!(f, "electrostatic solve requires periodic axes, axis {axis} is not")
            }
            Self::InvalidTimeStep { dt } => write!(f, "time step must be positive and finite, got {dt}"),
            Self::MissingField { field } => write!(f, "required field {field} is not allocated"),
            Self::InvalidMedium { parameter, value } => {
                write!(f, "medium parameter {parameter} is invalid: {value}")
            }
        }
    }
}

impl Error for SolverError {}
