//! Direct current deposition at the mid-step position.

use corona_core::{InvariantViolation, Staggering};
use corona_grid::Geometry;

use super::{CurrentDeposition, DepositKernel, GridSink};
use crate::shape::{self, ShapeOrder};
use crate::tile::ParticleTile;

/// `J_c += q w v_c / vol * S(x_mid)` with the staggering of each component.
#[derive(Clone, Debug)]
pub struct DirectKernel<'a> {
    geom: &'a Geometry,
    order: ShapeOrder,
    time: f64,
    charge: f64,
    ng: usize,
    level: usize,
    stag: [Staggering; 3],
}

impl<'a> DirectKernel<'a> {
    /// Kernel for `params`, depositing onto components with staggering `stag`.
    pub fn new(params: &CurrentDeposition<'a>, charge: f64, ng: usize, stag: [Staggering; 3]) -> Self {
        Self {
            geom: params.geom,
            order: params.order,
            time: params.window_shift + params.relative_time,
            charge,
            ng,
            level: params.level,
            stag,
        }
    }
}

impl DepositKernel for DirectKernel<'_> {
    const COMPONENTS: usize = 3;

    fn deposit<S: GridSink>(
        &self,
        tile: &ParticleTile,
        i: usize,
        sink: &mut S,
    ) -> Result<(), InvariantViolation> {
        let x = tile.position(i);
        let v = tile.velocity(i);
        let mid: [f64; 3] = std::array::from_fn(|d| x[d] + self.time * v[d]);
        shape::check_allowance(self.geom, mid, self.ng, self.order, self.level)?;
        let scale = self.charge * tile.w[i] / self.geom.cell_volume();
        for c in 0..3 {
            if v[c] == 0.0 {
                continue;
            }
            let s: [shape::ShapeWeights; 3] = std::array::from_fn(|d| {
                shape::weights_at(self.order, self.geom, d, mid[d], self.stag[c].offset(d))
            });
            let value = scale * v[c];
            for (k, wz) in s[2].iter() {
                for (j, wy) in s[1].iter() {
                    for (ii, wx) in s[0].iter() {
                        sink.add(c, [ii, j, k], value * wx * wy * wz);
                    }
                }
            }
        }
        Ok(())
    }
}
