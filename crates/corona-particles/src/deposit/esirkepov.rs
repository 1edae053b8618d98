//! Esirkepov charge-conserving current deposition.
//!
//! The particle moves from `x_old = x_new - dt v` to `x_new` during the
//! deposition interval. Nodal shape factors at both ends, laid on a common
//! index window, give the decomposition `W_d` of `S1 - S0` into per-axis
//! fluxes. The current along `d` is the running sum
//! `J[i] = J[i-1] - q w dx_d / (vol dt) * W_d[i]`, where index `i` of a
//! cell-centered component sits at `i + 1/2`.

use smallvec::SmallVec;

use corona_core::InvariantViolation;
use corona_grid::Geometry;

use super::{CurrentDeposition, DepositKernel, GridSink};
use crate::shape::{self, ShapeOrder};
use crate::tile::ParticleTile;

type Weights = SmallVec<[f64; 8]>;

/// Old and new shape factors of one particle along one axis, on a shared
/// index window.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisWindow {
    /// Grid index of the first window entry.
    pub lo: i64,
    /// Shape factor at the old position.
    pub s0: Weights,
    /// `S1 - S0`.
    pub ds: Weights,
}

impl AxisWindow {
    /// Window of an inactive axis: one point of unit weight, no motion.
    pub fn inactive() -> Self {
        Self {
            lo: 0,
            s0: SmallVec::from_slice(&[1.0]),
            ds: SmallVec::from_slice(&[0.0]),
        }
    }

    /// Window covering both shapes at cell positions `x_old` and `x_new`.
    pub fn new(order: ShapeOrder, x_old: f64, x_new: f64) -> Self {
        let a = shape::compute(order, x_old);
        let b = shape::compute(order, x_new);
        let lo = a.start.min(b.start);
        let hi = a.end().max(b.end());
        let len = (hi - lo) as usize;
        let mut s0: Weights = SmallVec::from_elem(0.0, len);
        let mut ds: Weights = SmallVec::from_elem(0.0, len);
        for (i, w) in a.iter() {
            let n = (i - lo) as usize;
            s0[n] = w;
            ds[n] -= w;
        }
        for (i, w) in b.iter() {
            ds[(i - lo) as usize] += w;
        }
        Self { lo, s0, ds }
    }

    /// Number of window entries.
    pub fn len(&self) -> usize {
        self.s0.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.s0.is_empty()
    }
}

/// Shape windows of one particle along all three axes.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeWindow {
    /// Per-axis windows.
    pub axes: [AxisWindow; 3],
}

impl ShapeWindow {
    /// Windows for a particle moving from `old` to `new` (physical
    /// positions) on `geom`.
    pub fn new(geom: &Geometry, order: ShapeOrder, old: [f64; 3], new: [f64; 3]) -> Self {
        Self {
            axes: std::array::from_fn(|d| {
                if geom.active(d) {
                    AxisWindow::new(order, geom.to_cells(d, old[d]), geom.to_cells(d, new[d]))
                } else {
                    AxisWindow::inactive()
                }
            }),
        }
    }

    /// Flux weight `W_d` at window offsets `n = [i, j, k]`.
    ///
    /// `W_d = ΔS_d (S0_a S0_b + ½ΔS_a S0_b + ½S0_a ΔS_b + ⅓ΔS_a ΔS_b)` with
    /// `a`, `b` the two other axes.
    pub fn flux(&self, d: usize, n: [usize; 3]) -> f64 {
        self.axes[d].ds[n[d]] * self.transverse_average(d, n)
    }

    /// Shape product over the two axes other than `d`, averaged along the
    /// straight path. It is also the weight of the out-of-plane current in 2D.
    pub fn transverse_average(&self, d: usize, n: [usize; 3]) -> f64 {
        let (a, b) = other_axes(d);
        let s0a = self.axes[a].s0[n[a]];
        let dsa = self.axes[a].ds[n[a]];
        let s0b = self.axes[b].s0[n[b]];
        let dsb = self.axes[b].ds[n[b]];
        s0a * s0b + 0.5 * dsa * s0b + 0.5 * s0a * dsb + dsa * dsb / 3.0
    }

    /// Grid index of window offsets `n`.
    pub fn index(&self, n: [usize; 3]) -> [i64; 3] {
        std::array::from_fn(|d| self.axes[d].lo + n[d] as i64)
    }

    /// Window lengths.
    pub fn extent(&self) -> [usize; 3] {
        std::array::from_fn(|d| self.axes[d].len())
    }
}

fn other_axes(d: usize) -> (usize, usize) {
    match d {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Geometry and timing of a charge-conserving deposition window.
#[derive(Clone, Debug)]
pub(crate) struct WindowSetup<'a> {
    pub(crate) geom: &'a Geometry,
    pub(crate) order: ShapeOrder,
    pub(crate) dt: f64,
    pub(crate) window_shift: f64,
    pub(crate) ng: usize,
    pub(crate) level: usize,
}

impl<'a> WindowSetup<'a> {
    pub(crate) fn new(params: &CurrentDeposition<'a>, ng: usize) -> Self {
        Self {
            geom: params.geom,
            order: params.order,
            dt: params.dt,
            window_shift: params.window_shift,
            ng,
            level: params.level,
        }
    }

    /// Shape window and velocity of particle `i`, after checking both ends
    /// of its path against the guard allowance.
    pub(crate) fn window(
        &self,
        tile: &ParticleTile,
        i: usize,
    ) -> Result<(ShapeWindow, [f64; 3]), InvariantViolation> {
        let x = tile.position(i);
        let v = tile.velocity(i);
        let new: [f64; 3] = std::array::from_fn(|d| x[d] + self.window_shift * v[d]);
        let old: [f64; 3] = std::array::from_fn(|d| new[d] - self.dt * v[d]);
        shape::check_allowance(self.geom, old, self.ng, self.order, self.level)?;
        shape::check_allowance(self.geom, new, self.ng, self.order, self.level)?;
        Ok((ShapeWindow::new(self.geom, self.order, old, new), v))
    }
}

/// Esirkepov deposition of Jx, Jy, Jz.
#[derive(Clone, Debug)]
pub struct EsirkepovKernel<'a> {
    setup: WindowSetup<'a>,
    charge: f64,
}

impl<'a> EsirkepovKernel<'a> {
    /// Kernel for `params` and species charge `charge`, depositing into
    /// arrays with `ng` guards.
    pub fn new(params: &CurrentDeposition<'a>, charge: f64, ng: usize) -> Self {
        Self {
            setup: WindowSetup::new(params, ng),
            charge,
        }
    }
}

impl DepositKernel for EsirkepovKernel<'_> {
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
        let dx = geom.dx();
        let ext = win.extent();
        for d in 0..3 {
            if !geom.active(d) {
                // Out-of-plane current: q w v_d times the averaged in-plane shape.
                let scale = qw * v[d] / vol;
                for k in 0..ext[2] {
                    for j in 0..ext[1] {
                        for ii in 0..ext[0] {
                            let n = [ii, j, k];
                            let value = scale * win.transverse_average(d, n);
                            if value != 0.0 {
                                sink.add(d, win.index(n), value);
                            }
                        }
                    }
                }
                continue;
            }
            let coef = -qw * dx[d] / (vol * self.setup.dt);
            let (a, b) = other_axes(d);
            for nb in 0..ext[b] {
                for na in 0..ext[a] {
                    let mut running = 0.0;
                    for nd in 0..ext[d] {
                        let mut n = [0usize; 3];
                        n[d] = nd;
                        n[a] = na;
                        n[b] = nb;
                        running += coef * win.flux(d, n);
                        if running != 0.0 {
                            sink.add(d, win.index(n), running);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
