//! Guard-cell aware storage for one staggered field component.
//!
//! Every active axis stores `n + 2*ng + 1` points covering the indices
//! `[-ng, n + ng]`. The extra upper point is the closing node of a nodal
//! axis; for cell-centered data it is one more guard cell. Inactive axes
//! (y in 2D) store a single point at index 0.

use corona_core::{FieldKind, InvariantViolation, Staggering};

use crate::geometry::{Geometry, IndexBox};

/// Index arithmetic shared by [`FieldArray`], the atomic accumulation
/// array, and deposition scratch tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    n: [usize; 3],
    ng: [usize; 3],
    len: [usize; 3],
}

impl Layout {
    /// Layout for `n` valid points with `ng` guards on each active axis.
    pub fn new(n: [usize; 3], ng: usize, active: [bool; 3]) -> Self {
        let ng: [usize; 3] = std::array::from_fn(|d| if active[d] { ng } else { 0 });
        let n: [usize; 3] = std::array::from_fn(|d| if active[d] { n[d] } else { 1 });
        let len = std::array::from_fn(|d| {
            if active[d] {
                n[d] + 2 * ng[d] + 1
            } else {
                1
            }
        });
        Self { n, ng, len }
    }

    /// Layout matching a geometry.
    pub fn for_geometry(geom: &Geometry, ng: usize) -> Self {
        Self::new(geom.n_cells(), ng, geom.active_axes())
    }

    /// Valid points per axis.
    pub fn n(&self) -> [usize; 3] {
        self.n
    }

    /// Guard width per axis (0 on inactive axes).
    pub fn ng(&self) -> [usize; 3] {
        self.ng
    }

    /// Largest guard width over the axes.
    pub fn max_ng(&self) -> usize {
        self.ng.iter().copied().max().unwrap_or(0)
    }

    /// Stored points per axis.
    pub fn len(&self) -> [usize; 3] {
        self.len
    }

    /// Total stored points.
    pub fn num_points(&self) -> usize {
        self.len.iter().product()
    }

    /// Whether the layout stores nothing.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Whether axis `d` carries more than one point.
    pub fn is_active(&self, d: usize) -> bool {
        self.len[d] > 1
    }

    /// Box of every stored index.
    pub fn allocated_box(&self) -> IndexBox {
        IndexBox::new(
            std::array::from_fn(|d| -(self.ng[d] as i64)),
            std::array::from_fn(|d| self.len[d] as i64 - self.ng[d] as i64),
        )
    }

    /// Box of valid indices `[0, n)`.
    pub fn valid_box(&self) -> IndexBox {
        IndexBox::new([0; 3], self.n.map(|n| n as i64))
    }

    /// Valid box grown by `w` guards on active axes, clipped to storage.
    pub fn grown_box(&self, w: usize) -> IndexBox {
        let grow = std::array::from_fn(|d| if self.is_active(d) { w as i64 } else { 0 });
        let mut b = self.valid_box().grow(grow);
        // Include the closing point of the upper guard band.
        for d in 0..3 {
            if self.is_active(d) && w > 0 {
                b.hi[d] += 1;
            }
        }
        b.intersect(&self.allocated_box())
    }

    /// Whether `idx` is stored.
    pub fn contains(&self, idx: [i64; 3]) -> bool {
        self.allocated_box().contains(idx)
    }

    /// Whether `idx` is a valid (non-guard) point.
    pub fn is_valid_index(&self, idx: [i64; 3]) -> bool {
        (0..3).all(|d| idx[d] >= 0 && idx[d] < self.n[d] as i64)
    }

    /// Flat offset of a stored index, or `None` when outside storage.
    pub fn offset(&self, idx: [i64; 3]) -> Option<usize> {
        let mut off = 0usize;
        let mut stride = 1usize;
        for d in 0..3 {
            let p = idx[d] + self.ng[d] as i64;
            if p < 0 || p >= self.len[d] as i64 {
                return None;
            }
            off += p as usize * stride;
            stride *= self.len[d];
        }
        Some(off)
    }

    /// Flat offset of an index known to be stored.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is outside storage.
    pub fn index(&self, idx: [i64; 3]) -> usize {
        match self.offset(idx) {
            Some(off) => off,
            None => panic!("index {idx:?} outside layout {:?}", self.allocated_box()),
        }
    }

    /// Map `idx` into the valid box along periodic axes. Returns `None` when
    /// a non-periodic axis is outside the valid box.
    pub fn wrap_valid(&self, idx: [i64; 3], periodic: [bool; 3]) -> Option<[i64; 3]> {
        let mut out = idx;
        for d in 0..3 {
            let n = self.n[d] as i64;
            if out[d] >= 0 && out[d] < n {
                continue;
            }
            if !periodic[d] || !self.is_active(d) {
                return None;
            }
            out[d] = out[d].rem_euclid(n);
        }
        Some(out)
    }
}

/// One staggered field component with guard cells.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldArray {
    kind: FieldKind,
    stag: Staggering,
    layout: Layout,
    data: Vec<f64>,
    guard_valid: usize,
}

impl FieldArray {
    /// Allocate a zeroed array for `kind` on `geom` with `ng` guards.
    pub fn new(kind: FieldKind, geom: &Geometry, ng: usize) -> Self {
        Self::with_layout(kind, Layout::for_geometry(geom, ng))
    }

    /// Allocate a zeroed array with an explicit layout.
    pub fn with_layout(kind: FieldKind, layout: Layout) -> Self {
        Self {
            kind,
            stag: kind.staggering(),
            data: vec![0.0; layout.num_points()],
            guard_valid: layout.max_ng(),
            layout,
        }
    }

    /// Override the staggering (Vay deposition stores D nodally in the J arrays).
    pub fn with_staggering(mut self, stag: Staggering) -> Self {
        self.stag = stag;
        self
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Staggering of the stored samples.
    pub fn staggering(&self) -> Staggering {
        self.stag
    }

    /// Index layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Raw storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Raw mutable storage. Guard validity is cleared.
    pub fn data_mut(&mut self) -> &mut [f64] {
        self.guard_valid = 0;
        &mut self.data
    }

    /// Value at a stored index.
    pub fn get(&self, idx: [i64; 3]) -> f64 {
        self.data[self.layout.index(idx)]
    }

    /// Value at `idx`, or `None` outside storage.
    pub fn try_get(&self, idx: [i64; 3]) -> Option<f64> {
        self.layout.offset(idx).map(|o| self.data[o])
    }

    /// Overwrite the value at a stored index.
    pub fn set(&mut self, idx: [i64; 3], value: f64) {
        let o = self.layout.index(idx);
        self.data[o] = value;
    }

    /// Add to the value at a stored index.
    pub fn add(&mut self, idx: [i64; 3], value: f64) {
        let o = self.layout.index(idx);
        self.data[o] += value;
    }

    // ── Guard validity ──────────────────────────────────────────────

    /// Width of guard data consistent with the valid region.
    pub fn guard_valid(&self) -> usize {
        self.guard_valid
    }

    /// Record that guards have been filled to width `w`.
    pub fn mark_guards_filled(&mut self, w: usize) {
        self.guard_valid = w.min(self.layout.max_ng());
    }

    /// Record that the valid region changed and guards are stale.
    pub fn invalidate_guards(&mut self) {
        self.guard_valid = 0;
    }

    /// Fail unless guards are valid to at least width `w`.
    pub fn require_guards(&self, w: usize) -> Result<(), InvariantViolation> {
        if self.guard_valid >= w {
            Ok(())
        } else {
            Err(InvariantViolation::GuardCellsStale {
                field: self.kind,
                required: w,
                valid: self.guard_valid,
            })
        }
    }

    // ── Whole-array operations ──────────────────────────────────────

    /// Set every stored point, guards included.
    ///
    /// A uniform array is consistent with any guard fill.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
        self.guard_valid = self.layout.max_ng();
    }

    /// Copy values and guard validity from an array with the same layout.
    pub fn copy_from(&mut self, other: &FieldArray) -> Result<(), InvariantViolation> {
        self.check_layout(other)?;
        self.data.copy_from_slice(&other.data);
        self.guard_valid = other.guard_valid;
        Ok(())
    }

    /// `self += a * x` over all stored points.
    pub fn axpy(&mut self, a: f64, x: &FieldArray) -> Result<(), InvariantViolation> {
        self.check_layout(x)?;
        for (s, v) in self.data.iter_mut().zip(&x.data) {
            *s += a * v;
        }
        self.guard_valid = self.guard_valid.min(x.guard_valid);
        Ok(())
    }

    /// Multiply every stored point by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Largest absolute value over the valid region.
    pub fn max_abs_valid(&self) -> f64 {
        self.layout
            .valid_box()
            .iter()
            .map(|idx| self.get(idx).abs())
            .fold(0.0, f64::max)
    }

    /// Sum over the valid region.
    pub fn sum_valid(&self) -> f64 {
        self.layout.valid_box().iter().map(|idx| self.get(idx)).sum()
    }

    /// Shift data by `cells` toward lower indices along `axis`, zero-filling
    /// the vacated upper points. Guards become stale.
    pub fn shift_down(&mut self, axis: usize, cells: usize) {
        if cells == 0 || !self.layout.is_active(axis) {
            return;
        }
        let b = self.layout.allocated_box();
        for idx in b.iter() {
            let mut src = idx;
            src[axis] += cells as i64;
            let v = self.try_get(src).unwrap_or(0.0);
            self.set(idx, v);
        }
        self.guard_valid = 0;
    }

    fn check_layout(&self, other: &FieldArray) -> Result<(), InvariantViolation> {
        if self.layout == other.layout {
            Ok(())
        } else {
            Err(InvariantViolation::ShapeMismatch {
                expected: self.layout.n(),
                found: other.layout.n(),
            })
        }
    }
}
