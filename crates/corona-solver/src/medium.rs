//! Uniform media for the finite-difference E update.

use corona_core::constants::{EP0, MU0};
use corona_core::InvariantViolation;

use crate::error::SolverError;

/// The material filling a patch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Medium {
    /// Free space.
    #[default]
    Vacuum,
    /// Uniform conductivity, permittivity and permeability.
    Macroscopic {
        /// Conductivity, S/m.
        sigma: f64,
        /// Permittivity, F/m.
        epsilon: f64,
        /// Permeability, H/m.
        mu: f64,
    },
}

/// Coefficients of `E = alpha E + beta (curl(B) / mu - J)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediumCoefficients {
    /// Damping of the previous E.
    pub alpha: f64,
    /// Source scale.
    pub beta: f64,
    /// Inverse permeability.
    pub inv_mu: f64,
}

impl Medium {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vacuum => "vacuum",
            Self::Macroscopic { .. } => "macroscopic",
        }
    }

    /// Check the parameters are physical.
    pub fn validate(&self) -> Result<(), SolverError> {
        if let Self::Macroscopic { sigma, epsilon, mu } = *self {
            for (parameter, value, allow_zero) in
                [("sigma", sigma, true), ("epsilon", epsilon, false), ("mu", mu, false)]
            {
                let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
                if !ok {
                    return Err(SolverError::InvalidMedium { parameter, value });
                }
            }
        }
        Ok(())
    }

    /// Fail unless the medium is vacuum; spectral and electrostatic solvers
    /// have no medium kernel.
    pub fn require_vacuum(&self, solver: &'static str) -> Result<(), InvariantViolation> {
        match self {
            Self::Vacuum => Ok(()),
            Self::Macroscopic { .. } => Err(InvariantViolation::UnsupportedMedium {
                solver,
                medium: self.name(),
            }),
        }
    }

    /// Update coefficients for a step of `dt`.
    pub fn coefficients(&self, dt: f64) -> MediumCoefficients {
        match *self {
            Self::Vacuum => MediumCoefficients {
                alpha: 1.0,
                beta: dt / EP0,
                inv_mu: 1.0 / MU0,
            },
            Self::Macroscopic { sigma, epsilon, mu } => {
                let fac = 0.5 * sigma * dt / epsilon;
                MediumCoefficients {
                    alpha: (1.0 - fac) / (1.0 + fac),
                    beta: dt / (epsilon * (1.0 + fac)),
                    inv_mu: 1.0 / mu,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lossless_vacuum_parameters_match_vacuum() {
        let m = Medium::Macroscopic {
            sigma: 0.0,
            epsilon: EP0,
            mu: MU0,
        };
        let a = m.coefficients(1e-12);
        let b = Medium::Vacuum.coefficients(1e-12);
        assert_relative_eq!(a.alpha, b.alpha);
        assert_relative_eq!(a.beta, b.beta);
        assert_relative_eq!(a.inv_mu, b.inv_mu);
    }

    #[test]
    fn conductivity_damps() {
        let m = Medium::Macroscopic {
            sigma: 1e3,
            epsilon: EP0,
            mu: MU0,
        };
        let a = m.coefficients(1e-12);
        assert!(a.alpha < 1.0 && a.alpha > -1.0);
    }

    #[test]
    fn rejects_non_physical_parameters() {
        let m = Medium::Macroscopic {
            sigma: -1.0,
            epsilon: EP0,
            mu: MU0,
        };
        assert!(matches!(
            m.validate(),
            Err(SolverError::InvalidMedium { parameter: "sigma", .. })
        ));
        assert!(Medium::Vacuum.require_vacuum("PSATD").is_ok());
        let m = Medium::Macroscopic {
            sigma: 0.0,
            epsilon: EP0,
            mu: MU0,
        };
        assert!(matches!(
            m.require_vacuum("PSATD"),
            Err(InvariantViolation::UnsupportedMedium { solver: "PSATD", medium: "macroscopic" })
        ));
    }
}
