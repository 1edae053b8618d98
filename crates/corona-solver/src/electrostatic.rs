//! Periodic electrostatic field solve.
//!
//! `phi = rho / (eps0 k^2)` in Fourier space, then `E = -i k phi` sampled
//! at the E staggering. B is zeroed. The `k = 0` mode of phi is dropped,
//! which fixes the neutralizing background.

use corona_core::constants::EP0;
use corona_core::{InvariantViolation, Staggering};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use crate::error::SolverError;
use crate::fields::EmFields;
use crate::psatd::{SpectralField, SpectralTransform};

/// Poisson solver for a fully periodic patch.
#[derive(Clone, Debug)]
pub struct ElectrostaticSolver {
    transform: SpectralTransform,
}

impl ElectrostaticSolver {
    /// Solver for the arrays of `fields`. Every active axis must be periodic.
    pub fn new(fields: &EmFields) -> Result<Self, SolverError> {
        let geom = &fields.geom;
        if let Some(axis) = (0..3).find(|&d| geom.active(d) && !geom.periodic()[d]) {
            return Err(SolverError::NonPeriodicPoisson { axis });
        }
        Ok(Self {
            transform: SpectralTransform::new(geom, fields.e[0].layout()),
        })
    }

    /// Compute E from the new charge density and zero B.
    pub fn solve(&self, fields: &mut EmFields) -> Result<(), InvariantViolation> {
        let rho = self.transform.forward(&fields.rho[1], Staggering::NODAL)?;
        let i = Complex::<f64>::i();
        let kspace = self.transform.kspace();
        let mut e: [SpectralField; 3] = std::array::from_fn(|_| self.transform.zeros());
        for (m, k) in kspace.iter().enumerate() {
            let k2 = k[0] * k[0] + k[1] * k[1] + k[2] * k[2];
            if k2 == 0.0 {
                continue;
            }
            let phi = rho[m] / (EP0 * k2);
            for d in 0..3 {
                e[d][m] = -i * k[d] * phi;
            }
        }
        for (d, spec) in e.iter().enumerate() {
            let stag = fields.e[d].staggering();
            self.transform.backward(spec, stag, &mut fields.e[d])?;
        }
        for b in &mut fields.b {
            b.fill(0.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldOptions;
    use corona_grid::Geometry;
    use std::f64::consts::PI;

    fn fields(periodic: [bool; 2]) -> EmFields {
        let g = Geometry::xz([32, 4], [0.25, 1.0], [0.0, 0.0], periodic).unwrap();
        EmFields::new(g, &FieldOptions { ng: 2, ..FieldOptions::default() })
    }

    #[test]
    fn sinusoidal_charge_gives_gauss_field() {
        // rho = rho0 cos(k x) gives Ex = rho0 sin(k x) / (eps0 k) at Ex positions.
        let mut f = fields([true, true]);
        let k = 2.0 * PI / 8.0;
        let rho0 = 1e-6;
        for idx in f.rho[1].layout().valid_box().iter() {
            f.rho[1].set(idx, rho0 * (k * idx[0] as f64 * 0.25).cos());
        }
        f.b[0].fill(3.0);
        let s = ElectrostaticSolver::new(&f).unwrap();
        s.solve(&mut f).unwrap();
        let amp = rho0 / (EP0 * k);
        for i in 0..32 {
            let expected = amp * (k * (i as f64 + 0.5) * 0.25).sin();
            assert!((f.e[0].get([i, 0, 1]) - expected).abs() < 1e-9 * amp);
        }
        assert!(f.e[2].max_abs_valid() < 1e-9 * amp);
        assert_eq!(f.b[0].max_abs_valid(), 0.0);
    }

    #[test]
    fn non_periodic_axis_is_rejected() {
        let f = fields([true, false]);
        assert!(matches!(
            ElectrostaticSolver::new(&f),
            Err(SolverError::NonPeriodicPoisson { axis: 2 })
        ));
    }
}
