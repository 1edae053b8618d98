//! Patch geometry and integer index boxes.

use crate::error::GridError;

/// Spatial dimensionality.
///
/// `Two` is the Cartesian XZ plane: the y axis is inactive, holds a single
/// point, and carries no guard cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    /// XZ plane.
    Two,
    /// Full 3D Cartesian.
    Three,
}

impl Dim {
    /// Per-axis activity flags.
    pub fn active(self) -> [bool; 3] {
        match self {
            Self::Two => [true, false, true],
            Self::Three => [true, true, true],
        }
    }
}

/// A half-open box of integer indices `[lo, hi)` per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexBox {
    /// Inclusive lower corner.
    pub lo: [i64; 3],
    /// Exclusive upper corner.
    pub hi: [i64; 3],
}

impl IndexBox {
    /// Create a box from its corners.
    pub fn new(lo: [i64; 3], hi: [i64; 3]) -> Self {
        Self { lo, hi }
    }

    /// Number of points along each axis (0 if inverted).
    pub fn extent(&self) -> [usize; 3] {
        std::array::from_fn(|d| (self.hi[d] - self.lo[d]).max(0) as usize)
    }

    /// Total number of points.
    pub fn num_points(&self) -> usize {
        self.extent().iter().product()
    }

    /// Whether the box holds no points.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Whether `idx` lies inside the box.
    pub fn contains(&self, idx: [i64; 3]) -> bool {
        (0..3).all(|d| idx[d] >= self.lo[d] && idx[d] < self.hi[d])
    }

    /// Grow by `n[d]` on both sides of each axis.
    pub fn grow(&self, n: [i64; 3]) -> Self {
        Self {
            lo: std::array::from_fn(|d| self.lo[d] - n[d]),
            hi: std::array::from_fn(|d| self.hi[d] + n[d]),
        }
    }

    /// Intersection with another box.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            lo: std::array::from_fn(|d| self.lo[d].max(other.lo[d])),
            hi: std::array::from_fn(|d| self.hi[d].min(other.hi[d])),
        }
    }

    /// Iterate over all indices, x fastest.
    pub fn iter(&self) -> impl Iterator<Item = [i64; 3]> + '_ {
        let b = *self;
        (b.lo[2]..b.hi[2])
            .flat_map(move |k| (b.lo[1]..b.hi[1]).map(move |j| (j, k)))
            .flat_map(move |(j, k)| (b.lo[0]..b.hi[0]).map(move |i| [i, j, k]))
    }
}

/// Geometry of one patch: cell counts, spacing, origin, and periodicity.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    dim: Dim,
    n_cells: [usize; 3],
    dx: [f64; 3],
    prob_lo: [f64; 3],
    periodic: [bool; 3],
}

impl Geometry {
    /// Build a geometry. On an inactive axis the cell count is forced to 1
    /// and the spacing to 1 so that volumes reduce to the active axes.
    pub fn new(
        dim: Dim,
        n_cells: [usize; 3],
        dx: [f64; 3],
        prob_lo: [f64; 3],
        periodic: [bool; 3],
    ) -> Result<Self, GridError> {
        let active = dim.active();
        let mut n = n_cells;
        let mut h = dx;
        let mut p = periodic;
        for d in 0..3 {
            if !active[d] {
                n[d] = 1;
                h[d] = 1.0;
                p[d] = false;
                continue;
            }
            if n[d] == 0 {
                return Err(GridError::EmptyAxis { axis: d });
            }
            if !(h[d].is_finite() && h[d] > 0.0) {
                return Err(GridError::InvalidSpacing {
                    axis: d,
                    value: h[d],
                });
            }
        }
        Ok(Self {
            dim,
            n_cells: n,
            dx: h,
            prob_lo,
            periodic: p,
        })
    }

    /// Convenience constructor for a 2D XZ geometry.
    pub fn xz(
        n: [usize; 2],
        dx: [f64; 2],
        lo: [f64; 2],
        periodic: [bool; 2],
    ) -> Result<Self, GridError> {
        Self::new(
            Dim::Two,
            [n[0], 1, n[1]],
            [dx[0], 1.0, dx[1]],
            [lo[0], 0.0, lo[1]],
            [periodic[0], false, periodic[1]],
        )
    }

    /// Dimensionality.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Whether axis `d` is active.
    pub fn active(&self, d: usize) -> bool {
        self.dim.active()[d]
    }

    /// Per-axis activity flags.
    pub fn active_axes(&self) -> [bool; 3] {
        self.dim.active()
    }

    /// Valid cell count per axis.
    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    /// Cell size per axis.
    pub fn dx(&self) -> [f64; 3] {
        self.dx
    }

    /// Physical lower corner.
    pub fn prob_lo(&self) -> [f64; 3] {
        self.prob_lo
    }

    /// Physical upper corner.
    pub fn prob_hi(&self) -> [f64; 3] {
        std::array::from_fn(|d| self.prob_lo[d] + self.n_cells[d] as f64 * self.dx[d])
    }

    /// Periodicity per axis.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Cell volume over the active axes (area in 2D).
    pub fn cell_volume(&self) -> f64 {
        (0..3)
            .filter(|&d| self.active(d))
            .map(|d| self.dx[d])
            .product()
    }

    /// The valid cell box `[0, n)`.
    pub fn valid_box(&self) -> IndexBox {
        IndexBox::new([0; 3], self.n_cells.map(|n| n as i64))
    }

    /// Position `x` along axis `d` in cell units relative to the origin.
    pub fn to_cells(&self, d: usize, x: f64) -> f64 {
        (x - self.prob_lo[d]) / self.dx[d]
    }

    /// Physical coordinate of a sample at index `i` with offset `offset`
    /// (0 for nodal, 0.5 for cell-centered).
    pub fn coordinate(&self, d: usize, i: i64, offset: f64) -> f64 {
        self.prob_lo[d] + (i as f64 + offset) * self.dx[d]
    }

    /// Move the physical origin along axis `d`.
    pub fn shift_origin(&mut self, d: usize, distance: f64) {
        self.prob_lo[d] += distance;
    }

    /// Geometry of a refined patch covering `patch` (in this geometry's cell
    /// indices), refined by `ratio`. Refined patches are never periodic.
    pub fn refine(&self, patch: IndexBox, ratio: [usize; 3]) -> Result<Self, GridError> {
        self.check_patch(patch, ratio)?;
        let ext = patch.extent();
        Self::new(
            self.dim,
            std::array::from_fn(|d| ext[d] * ratio[d]),
            std::array::from_fn(|d| self.dx[d] / ratio[d] as f64),
            std::array::from_fn(|d| self.prob_lo[d] + patch.lo[d] as f64 * self.dx[d]),
            [false; 3],
        )
    }

    /// Geometry of the coarse patch covering `patch` at this resolution.
    pub fn subpatch(&self, patch: IndexBox) -> Result<Self, GridError> {
        self.check_patch(patch, [1; 3])?;
        Self::new(
            self.dim,
            patch.extent(),
            self.dx,
            std::array::from_fn(|d| self.prob_lo[d] + patch.lo[d] as f64 * self.dx[d]),
            [false; 3],
        )
    }

    fn check_patch(&self, patch: IndexBox, ratio: [usize; 3]) -> Result<(), GridError> {
        for d in 0..3 {
            let bad_ratio = ratio[d] == 0 || (!self.active(d) && ratio[d] != 1);
            if bad_ratio {
                return Err(GridError::InvalidRatio { ratio });
            }
        }
        let domain = self.valid_box();
        if patch.is_empty() || patch.intersect(&domain) != patch {
            return Err(GridError::PatchOutsideDomain {
                patch: (patch.lo, patch.hi),
                domain: self.n_cells,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_d_collapses_y() {
        let g = Geometry::xz([8, 16], [0.5, 0.25], [0.0, 1.0], [true, true]).unwrap();
        assert_eq!(g.n_cells(), [8, 1, 16]);
        assert_eq!(g.cell_volume(), 0.125);
        assert!(!g.periodic()[1]);
        assert_eq!(g.prob_hi(), [4.0, 1.0, 5.0]);
    }

    #[test]
    fn zero_cells_rejected() {
        let err = Geometry::new(Dim::Three, [4, 0, 4], [1.0; 3], [0.0; 3], [true; 3]);
        assert_eq!(err, Err(GridError::EmptyAxis { axis: 1 }));
    }

    #[test]
    fn refine_halves_spacing_and_drops_periodicity() {
        let g = Geometry::new(Dim::Three, [8; 3], [1.0; 3], [0.0; 3], [true; 3]).unwrap();
        let patch = IndexBox::new([2, 2, 2], [6, 6, 6]);
        let fine = g.refine(patch, [2; 3]).unwrap();
        assert_eq!(fine.n_cells(), [8; 3]);
        assert_eq!(fine.dx(), [0.5; 3]);
        assert_eq!(fine.prob_lo(), [2.0; 3]);
        assert_eq!(fine.periodic(), [false; 3]);
    }

    #[test]
    fn refine_rejects_patch_outside_domain() {
        let g = Geometry::new(Dim::Three, [8; 3], [1.0; 3], [0.0; 3], [true; 3]).unwrap();
        let patch = IndexBox::new([4, 4, 4], [10, 6, 6]);
        assert!(matches!(
            g.refine(patch, [2; 3]),
            Err(GridError::PatchOutsideDomain { .. })
        ));
    }

    #[test]
    fn index_box_iterates_x_fastest() {
        let b = IndexBox::new([0, 0, 0], [2, 1, 2]);
        let all: Vec<_> = b.iter().collect();
        assert_eq!(all, vec![[0, 0, 0], [1, 0, 0], [0, 0, 1], [1, 0, 1]]);
        assert_eq!(IndexBox::new([0; 3], [0, 3, 3]).iter().count(), 0);
    }
}
