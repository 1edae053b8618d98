//! B-spline shape factors of order 1 to 3.
//!
//! Positions are given in cell units relative to the patch origin, already
//! shifted by the staggering of the target quantity (`x - 0.5` on
//! cell-centered axes). A shape of order N spans N+1 grid points.

use corona_core::InvariantViolation;
use corona_grid::Geometry;

/// Interpolation order of the particle shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapeOrder {
    /// Cloud-in-cell.
    Linear,
    /// Triangular-shaped cloud.
    Quadratic,
    /// Cubic B-spline.
    #[default]
    Cubic,
}

impl ShapeOrder {
    /// Numeric order N.
    pub fn order(self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
            Self::Cubic => 3,
        }
    }

    /// Number of grid points touched per axis.
    pub fn support(self) -> usize {
        self.order() + 1
    }

    /// Half the order, in cells.
    pub fn half_width(self) -> f64 {
        self.order() as f64 / 2.0
    }

    /// Order from its numeric value.
    pub fn from_order(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Linear),
            2 => Some(Self::Quadratic),
            3 => Some(Self::Cubic),
            _ => None,
        }
    }
}

/// Weights of one particle along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeWeights {
    /// Grid index of the first weight.
    pub start: i64,
    /// Weights; only the first `len` are meaningful.
    pub w: [f64; 4],
    /// Number of weights.
    pub len: usize,
}

impl ShapeWeights {
    /// The single weight used on an inactive axis.
    pub const INACTIVE: Self = Self {
        start: 0,
        w: [1.0, 0.0, 0.0, 0.0],
        len: 1,
    };

    /// `(index, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        (0..self.len).map(move |n| (self.start + n as i64, self.w[n]))
    }

    /// One past the last index touched.
    pub fn end(&self) -> i64 {
        self.start + self.len as i64
    }
}

/// Shape weights at position `x` (cell units, staggering applied).
pub fn compute(order: ShapeOrder, x: f64) -> ShapeWeights {
    match order {
        ShapeOrder::Linear => {
            let i = x.floor();
            let xi = x - i;
            ShapeWeights {
                start: i as i64,
                w: [1.0 - xi, xi, 0.0, 0.0],
                len: 2,
            }
        }
        ShapeOrder::Quadratic => {
            let j = (x + 0.5).floor();
            let xi = x - j;
            ShapeWeights {
                start: j as i64 - 1,
                w: [
                    0.5 * (0.5 - xi) * (0.5 - xi),
                    0.75 - xi * xi,
                    0.5 * (0.5 + xi) * (0.5 + xi),
                    0.0,
                ],
                len: 3,
            }
        }
        ShapeOrder::Cubic => {
            let i = x.floor();
            let xi = x - i;
            let omx = 1.0 - xi;
            let sixth = 1.0 / 6.0;
            ShapeWeights {
                start: i as i64 - 1,
                w: [
                    sixth * omx * omx * omx,
                    sixth * (4.0 - 6.0 * xi * xi + 3.0 * xi * xi * xi),
                    sixth * (1.0 + 3.0 * xi + 3.0 * xi * xi - 3.0 * xi * xi * xi),
                    sixth * xi * xi * xi,
                ],
                len: 4,
            }
        }
    }
}

/// Weights for a quantity with node offset `offset` at physical position
/// `pos` along axis `d` of `geom`. Inactive axes get [`ShapeWeights::INACTIVE`].
pub fn weights_at(order: ShapeOrder, geom: &Geometry, d: usize, pos: f64, offset: f64) -> ShapeWeights {
    if geom.active(d) {
        compute(order, geom.to_cells(d, pos) - offset)
    } else {
        ShapeWeights::INACTIVE
    }
}

/// Largest distance, in cells, by which `pos` lies outside the valid box of
/// `geom` over the active axes.
pub fn excursion(geom: &Geometry, pos: [f64; 3]) -> f64 {
    let n = geom.n_cells();
    (0..3)
        .filter(|&d| geom.active(d))
        .map(|d| {
            let x = geom.to_cells(d, pos[d]);
            (-x).max(x - n[d] as f64).max(0.0)
        })
        .fold(0.0, f64::max)
}

/// Fail when `pos` is further outside the patch than `ng - N/2` cells.
pub fn check_allowance(
    geom: &Geometry,
    pos: [f64; 3],
    ng: usize,
    order: ShapeOrder,
    level: usize,
) -> Result<(), InvariantViolation> {
    let e = excursion(geom, pos);
    let allowed = ng as f64 - order.half_width();
    if e > allowed {
        Err(InvariantViolation::ParticleOutsideGuard {
            level,
            excursion: e,
            allowed,
        })
    } else {
        Ok(())
    }
}
