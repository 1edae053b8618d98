//! Field interpolation from the grid to particle positions.

use corona_core::InvariantViolation;
use corona_grid::{FieldArray, Geometry};

use crate::shape::{self, ShapeOrder};

/// Borrowed E and B components of one patch, the source of the gather.
#[derive(Clone, Copy, Debug)]
pub struct FieldRefs<'a> {
    /// Patch geometry.
    pub geom: &'a Geometry,
    /// Ex, Ey, Ez.
    pub e: [&'a FieldArray; 3],
    /// Bx, By, Bz.
    pub b: [&'a FieldArray; 3],
}

impl<'a> FieldRefs<'a> {
    /// Group borrowed components.
    pub fn new(geom: &'a Geometry, e: [&'a FieldArray; 3], b: [&'a FieldArray; 3]) -> Self {
        Self { geom, e, b }
    }

    /// Fail unless every component has guards valid to width `w`.
    pub fn require_guards(&self, w: usize) -> Result<(), InvariantViolation> {
        for a in self.e.iter().chain(self.b.iter()) {
            a.require_guards(w)?;
        }
        Ok(())
    }

    /// E and B at `pos`, interpolated with a shape of `order` and each
    /// component's own staggering.
    ///
    /// Points outside storage contribute zero; callers bound the particle
    /// excursion with [`shape::check_allowance`] beforehand.
    pub fn gather(&self, order: ShapeOrder, pos: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        let e = self.e.map(|a| interpolate(a, self.geom, order, pos));
        let b = self.b.map(|a| interpolate(a, self.geom, order, pos));
        (e, b)
    }
}

/// Value of one staggered component at `pos`.
pub fn interpolate(a: &FieldArray, geom: &Geometry, order: ShapeOrder, pos: [f64; 3]) -> f64 {
    let stag = a.staggering();
    let s: [shape::ShapeWeights; 3] =
        std::array::from_fn(|d| shape::weights_at(order, geom, d, pos[d], stag.offset(d)));
    let mut v = 0.0;
    for (k, wz) in s[2].iter() {
        for (j, wy) in s[1].iter() {
            for (i, wx) in s[0].iter() {
                if let Some(f) = a.try_get([i, j, k]) {
                    v += wx * wy * wz * f;
                }
            }
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use corona_core::FieldKind;

    fn geom() -> Geometry {
        Geometry::xz([8, 8], [0.5, 0.5], [0.0, 0.0], [true, true]).unwrap()
    }

    #[test]
    fn uniform_field_is_gathered_exactly_for_every_order() {
        let g = geom();
        let mut ex = FieldArray::new(FieldKind::Ex, &g, 3);
        ex.fill(2.5);
        let zero = FieldArray::new(FieldKind::Ey, &g, 3);
        let refs = FieldRefs::new(&g, [&ex, &zero, &zero], [&zero, &zero, &zero]);
        for order in [ShapeOrder::Linear, ShapeOrder::Quadratic, ShapeOrder::Cubic] {
            let (e, b) = refs.gather(order, [1.37, 0.0, 2.91]);
            assert_abs_diff_eq!(e[0], 2.5, epsilon = 1e-12);
            assert_eq!(e[1], 0.0);
            assert_eq!(b, [0.0; 3]);
        }
    }

    #[test]
    fn linear_gather_respects_cell_centering() {
        let g = geom();
        // Ex is cell-centered in x: sample i sits at x = (i + 0.5) dx.
        let mut ex = FieldArray::new(FieldKind::Ex, &g, 2);
        for idx in ex.layout().allocated_box().iter() {
            let x = g.coordinate(0, idx[0], 0.5);
            ex.set(idx, x);
        }
        let v = interpolate(&ex, &g, ShapeOrder::Linear, [1.1, 0.0, 1.0]);
        assert_abs_diff_eq!(v, 1.1, epsilon = 1e-12);
    }

    #[test]
    fn stale_guards_are_reported() {
        let g = geom();
        let mut ex = FieldArray::new(FieldKind::Ex, &g, 2);
        ex.invalidate_guards();
        let ok = FieldArray::new(FieldKind::Ey, &g, 2);
        let refs = FieldRefs::new(&g, [&ex, &ok, &ok], [&ok, &ok, &ok]);
        assert!(matches!(
            refs.require_guards(1),
            Err(InvariantViolation::GuardCellsStale { field: FieldKind::Ex, .. })
        ));
    }
}
