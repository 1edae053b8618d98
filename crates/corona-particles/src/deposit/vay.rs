//! Vay deposition: nodal `D` components for a spectral current solve.
//!
//! Each particle contributes `D_d = -q w / (vol dt) * W_d` at the nodes of
//! its Esirkepov window, without the running sum. The spectral solver turns
//! `D` into `J` with `J_d = D_d / (i k_d)`. In 2D the out-of-plane slot holds
//! the Esirkepov out-of-plane current directly.

use corona_core::InvariantViolation;

use super::esirkepov::WindowSetup;
use super::{CurrentDeposition, DepositKernel, GridSink};
use crate::tile::ParticleTile;

/// Vay deposition of Dx, Dy, Dz into the current arrays.
#[derive(Clone, Debug)]
pub struct VayKernel<'a> {
    setup: WindowSetup<'a>,
    charge: f64,
}

impl<'a> VayKernel<'a> {
    /// Kernel for `params` and species charge `charge`.
    pub fn new(params: &CurrentDeposition<'a>, charge: f64, ng: usize) -> Self {
        Self {
            setup: WindowSetup::new(params, ng),
            charge,
        }
    }
}

impl DepositKernel for VayKernel<'_> {
    const COMPONENTS: usize = 3;

    fn deposit<S: GridSink>(
        &self,
        tile: &ParticleTile,
        i: usize,
        sink: &mut S,
    ) -> Result<(), InvariantViolation> {
        let (win, v) = self.setup.window(tile, i)?;
        let geom = self.setup.geom;
        let qw = self.charge * tile.w[i];
        let vol = geom.cell_volume();
        let ext = win.extent();
        let coef = -qw / (vol * self.setup.dt);
        for k in 0..ext[2] {
            for j in 0..ext[1] {
                for ii in 0..ext[0] {
                    let n = [ii, j, k];
                    let idx = win.index(n);
                    for d in 0..3 {
                        let value = if geom.active(d) {
                            coef * win.flux(d, n)
                        } else {
                            qw * v[d] / vol * win.transverse_average(d, n)
                        };
                        if value != 0.0 {
                            sink.add(d, idx, value);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
