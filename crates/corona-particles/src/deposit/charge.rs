//! Charge density deposition on the nodes.

use corona_core::InvariantViolation;
use corona_grid::Geometry;

use super::{ChargeDeposition, DepositKernel, GridSink};
use crate::shape::{self, ShapeOrder};
use crate::tile::ParticleTile;

/// `rho += q w / vol * S(x + time v)`.
#[derive(Clone, Debug)]
pub struct ChargeKernel<'a> {
    geom: &'a Geometry,
    order: ShapeOrder,
    time: f64,
    charge: f64,
    ng: usize,
    level: usize,
}

impl<'a> ChargeKernel<'a> {
    /// Kernel for `params` and species charge `charge`.
    pub fn new(params: &ChargeDeposition<'a>, charge: f64, ng: usize) -> Self {
        Self {
            geom: params.geom,
            order: params.order,
            time: params.time,
            charge,
            ng,
            level: params.level,
        }
    }
}

impl DepositKernel for ChargeKernel<'_> {
    const COMPONENTS: usize = 1;

    fn deposit<S: GridSink>(
        &self,
        tile: &ParticleTile,
        i: usize,
        sink: &mut S,
    ) -> Result<(), InvariantViolation> {
        let x = tile.position(i);
        let pos: [f64; 3] = if self.time == 0.0 {
            x
        } else {
            let v = tile.velocity(i);
            std::array::from_fn(|d| x[d] + self.time * v[d])
        };
        shape::check_allowance(self.geom, pos, self.ng, self.order, self.level)?;
        let value = self.charge * tile.w[i] / self.geom.cell_volume();
        let s: [shape::ShapeWeights; 3] =
            std::array::from_fn(|d| shape::weights_at(self.order, self.geom, d, pos[d], 0.0));
        for (k, wz) in s[2].iter() {
            for (j, wy) in s[1].iter() {
                for (ii, wx) in s[0].iter() {
                    sink.add(0, [ii, j, k], value * wx * wy * wz);
                }
            }
        }
        Ok(())
    }
}
