//! Yee finite-difference time-domain update.
//!
//! B lives on faces and E on edges, so a curl of E lands on B positions
//! with forward differences and a curl of B lands on E positions with
//! backward differences. The direction of each difference follows from the
//! staggering of the differentiated array: nodal along the axis means a
//! forward difference, cell-centered a backward one.
//!
//! Every update writes the valid region only and leaves the written array's
//! guards stale. The caller fills guards between the split halves.

use corona_core::constants::{C, EP0};
use corona_core::InvariantViolation;
use corona_grid::{FieldArray, Geometry};

use crate::fields::EmFields;
use crate::medium::Medium;

/// Which half of the split advance an F update belongs to. The first half
/// uses the old charge density and the second half the new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    /// Before the E update.
    First,
    /// After the E update.
    Second,
}

/// Finite-difference solver for one patch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FdtdSolver {
    medium: Medium,
}

/// `d a / d x_d` at `idx`, one-sided in the direction the staggering of
/// `a` dictates. Zero along inactive axes.
fn derivative(a: &FieldArray, geom: &Geometry, idx: [i64; 3], d: usize) -> f64 {
    if !geom.active(d) {
        return 0.0;
    }
    let mut other = idx;
    let dx = geom.dx()[d];
    if a.staggering().nodal[d] {
        other[d] += 1;
        (a.get(other) - a.get(idx)) / dx
    } else {
        other[d] -= 1;
        (a.get(idx) - a.get(other)) / dx
    }
}

/// Component `c` of the discrete curl of `v` at `idx`.
fn curl(v: &[FieldArray; 3], geom: &Geometry, idx: [i64; 3], c: usize) -> f64 {
    let (p, q) = ((c + 1) % 3, (c + 2) % 3);
    derivative(&v[q], geom, idx, p) - derivative(&v[p], geom, idx, q)
}

fn divergence(v: &[FieldArray; 3], geom: &Geometry, idx: [i64; 3]) -> f64 {
    (0..3).map(|d| derivative(&v[d], geom, idx, d)).sum()
}

impl FdtdSolver {
    /// Solver for a uniform `medium`.
    pub fn new(medium: Medium) -> Self {
        Self { medium }
    }

    /// The medium.
    pub fn medium(&self) -> Medium {
        self.medium
    }

    /// `B -= dt curl E`, plus `dt c^2 grad G` when G is allocated.
    pub fn evolve_b(&self, fields: &mut EmFields, dt: f64) -> Result<(), InvariantViolation> {
        let EmFields { geom, e, b, g, .. } = fields;
        let g = g.as_ref();
        for a in e.iter() {
            a.require_guards(1)?;
        }
        if let Some(g) = g {
            g.require_guards(1)?;
        }
        for c in 0..3 {
            let valid = b[c].layout().valid_box();
            for idx in valid.iter() {
                let mut delta = -dt * curl(e, geom, idx, c);
                if let Some(g) = g {
                    delta += dt * C * C * derivative(g, geom, idx, c);
                }
                b[c].add(idx, delta);
            }
            b[c].invalidate_guards();
        }
        Ok(())
    }

    /// `E = alpha E + beta (curl(B)/mu - J)`, plus `dt c^2 grad F` when F is
    /// allocated. In vacuum this is `E += dt (c^2 curl B - J/eps0)`.
    pub fn evolve_e(&self, fields: &mut EmFields, dt: f64) -> Result<(), InvariantViolation> {
        let EmFields { geom, e, b, j, f, .. } = fields;
        let f = f.as_ref();
        for a in b.iter() {
            a.require_guards(1)?;
        }
        if let Some(f) = f {
            f.require_guards(1)?;
        }
        let m = self.medium.coefficients(dt);
        for c in 0..3 {
            let valid = e[c].layout().valid_box();
            for idx in valid.iter() {
                let source = m.inv_mu * curl(b, geom, idx, c) - j[c].get(idx);
                let mut value = m.alpha * e[c].get(idx) + m.beta * source;
                if let Some(f) = f {
                    value += dt * C * C * derivative(f, geom, idx, c);
                }
                e[c].set(idx, value);
            }
            e[c].invalidate_guards();
        }
        Ok(())
    }

    /// `F += dt (div E - rho/eps0)`. No-op without F.
    pub fn evolve_f(&self, fields: &mut EmFields, dt: f64, half: Half) -> Result<(), InvariantViolation> {
        let EmFields { geom, e, rho, f, .. } = fields;
        let Some(f) = f else {
            return Ok(());
        };
        for a in e.iter() {
            a.require_guards(1)?;
        }
        let rho = match half {
            Half::First => &rho[0],
            Half::Second => &rho[1],
        };
        let inv_eps = 1.0 / EP0;
        for idx in f.layout().valid_box().iter() {
            let delta = dt * (divergence(e, geom, idx) - rho.get(idx) * inv_eps);
            f.add(idx, delta);
        }
        f.invalidate_guards();
        Ok(())
    }

    /// `G += dt div B`. No-op without G.
    pub fn evolve_g(&self, fields: &mut EmFields, dt: f64) -> Result<(), InvariantViolation> {
        let EmFields { geom, b, g, .. } = fields;
        let Some(g) = g else {
            return Ok(());
        };
        for a in b.iter() {
            a.require_guards(1)?;
        }
        for idx in g.layout().valid_box().iter() {
            g.add(idx, dt * divergence(b, geom, idx));
        }
        g.invalidate_guards();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldOptions;
    use corona_grid::{halo, Dim};

    fn fields(options: FieldOptions) -> EmFields {
        let g = Geometry::new(Dim::Three, [8, 8, 8], [1.0; 3], [0.0; 3], [true; 3]).unwrap();
        EmFields::new(g, &options)
    }

    fn fill_all(fields: &mut EmFields) {
        for a in fields.arrays_mut() {
            halo::fill_boundary(a, 2, [true; 3]);
        }
    }

    #[test]
    fn uniform_fields_are_stationary() {
        let mut f = fields(FieldOptions::default());
        f.e[0].fill(3.0);
        f.b[2].fill(-1.0);
        let s = FdtdSolver::default();
        s.evolve_b(&mut f, 1e-10).unwrap();
        fill_all(&mut f);
        s.evolve_e(&mut f, 1e-10).unwrap();
        assert_eq!(f.e[0].get([3, 3, 3]), 3.0);
        assert_eq!(f.b[2].get([3, 3, 3]), -1.0);
    }

    #[test]
    fn stale_guards_are_rejected() {
        let mut f = fields(FieldOptions::default());
        f.e[2].invalidate_guards();
        let err = FdtdSolver::default().evolve_b(&mut f, 1e-10).unwrap_err();
        assert!(matches!(
            err,
            InvariantViolation::GuardCellsStale { required: 1, valid: 0, .. }
        ));
    }

    #[test]
    fn current_drives_electric_field() {
        let mut f = fields(FieldOptions::default());
        f.j[1].fill(2.0);
        let dt = 1e-12;
        FdtdSolver::default().evolve_e(&mut f, dt).unwrap();
        let expected = -dt * 2.0 / EP0;
        assert!((f.e[1].get([1, 2, 3]) - expected).abs() < 1e-12 * expected.abs());
        assert_eq!(f.e[1].guard_valid(), 0);
    }

    #[test]
    fn discrete_divergence_of_b_is_preserved() {
        let mut f = fields(FieldOptions::default());
        f.e[2].set([3, 4, 2], 1.0);
        f.e[0].set([5, 1, 6], -2.0);
        fill_all(&mut f);
        let s = FdtdSolver::default();
        for _ in 0..5 {
            s.evolve_b(&mut f, 1e-9).unwrap();
            fill_all(&mut f);
            s.evolve_e(&mut f, 1e-9).unwrap();
            fill_all(&mut f);
        }
        let geom = f.geom.clone();
        let g = FieldArray::new(corona_core::FieldKind::G, &geom, 2);
        for idx in g.layout().valid_box().iter() {
            assert!(divergence(&f.b, &geom, idx).abs() < 1e-18);
        }
    }

    #[test]
    fn f_tracks_gauss_law_error() {
        let mut f = fields(FieldOptions {
            div_e_cleaning: true,
            ..FieldOptions::default()
        });
        f.rho[0].set([2, 2, 2], EP0);
        let s = FdtdSolver::default();
        s.evolve_f(&mut f, 0.5, Half::First).unwrap();
        let fa = f.f.as_ref().unwrap();
        assert!((fa.get([2, 2, 2]) + 0.5).abs() < 1e-15);
        assert_eq!(fa.get([3, 2, 2]), 0.0);
    }
}
