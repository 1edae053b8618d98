//! One-way fine/coarse transfers for two-level mesh refinement.
//!
//! Restriction moves deposited sources from a fine patch onto the coarse
//! patch that covers it. Interpolation moves fields from a coarse array onto
//! a fine one. Neither keeps a reference to the other level; both are plain
//! functions invoked at fixed points of the step sequence.
//!
//! Index convention: fine index `f` and coarse index `c` refer to the same
//! node when `f == ratio * (c - offset)`, where `offset` is the coarse index
//! of the fine array's origin.

use smallvec::{smallvec, SmallVec};

use crate::array::FieldArray;
use crate::geometry::IndexBox;

type AxisStencil = SmallVec<[(i64, f64); 2]>;

/// Restriction weights of fine index `f` along one axis.
///
/// Every fine point distributes a total weight of `1/ratio`, so the sum of
/// density times cell volume is preserved.
fn restrict_stencil(f: i64, ratio: usize, nodal: bool) -> AxisStencil {
    let r = ratio as i64;
    if r == 1 {
        return smallvec![(f, 1.0)];
    }
    let c0 = f.div_euclid(r);
    if !nodal {
        return smallvec![(c0, 1.0 / ratio as f64)];
    }
    let rem = f - r * c0;
    let r2 = (ratio * ratio) as f64;
    if rem == 0 {
        smallvec![(c0, 1.0 / ratio as f64)]
    } else {
        smallvec![(c0, (r - rem) as f64 / r2), (c0 + 1, rem as f64 / r2)]
    }
}

/// Linear interpolation stencil of fine index `f` along one axis.
fn interp_stencil(f: i64, ratio: usize, offset: i64, stag: f64) -> AxisStencil {
    if ratio == 1 {
        return smallvec![(f + offset, 1.0)];
    }
    let xc = offset as f64 + (f as f64 + stag) / ratio as f64 - stag;
    let lo = xc.floor();
    let t = xc - lo;
    let lo = lo as i64;
    if t == 0.0 {
        smallvec![(lo, 1.0)]
    } else {
        smallvec![(lo, 1.0 - t), (lo + 1, t)]
    }
}

/// Read `idx` from `a`, wrapping periodic axes into the valid region.
/// Non-periodic points outside storage read as zero.
pub fn sample(a: &FieldArray, idx: [i64; 3], periodic: [bool; 3]) -> f64 {
    let layout = a.layout();
    if layout.is_valid_index(idx) {
        return a.get(idx);
    }
    if let Some(w) = layout.wrap_valid(idx, periodic) {
        return a.get(w);
    }
    a.try_get(idx).unwrap_or(0.0)
}

/// Overwrite `coarse` with the restriction of every stored point of `fine`
/// (guards included). Both arrays cover the same physical patch.
///
/// Nodal axes use weights (1/4, 1/2, 1/4) and cell-centered axes (1/2, 1/2)
/// for a ratio of 2. Contributions that fall outside `coarse` storage are
/// dropped.
pub fn restrict(fine: &FieldArray, coarse: &mut FieldArray, ratio: [usize; 3]) {
    coarse.fill(0.0);
    let stag = fine.staggering();
    let layout = *fine.layout();
    for idx in layout.allocated_box().iter() {
        let v = fine.get(idx);
        if v == 0.0 {
            continue;
        }
        let sx = restrict_stencil(idx[0], ratio[0], stag.nodal[0]);
        let sy = restrict_stencil(idx[1], ratio[1], stag.nodal[1]);
        let sz = restrict_stencil(idx[2], ratio[2], stag.nodal[2]);
        for &(k, wz) in &sz {
            for &(j, wy) in &sy {
                for &(i, wx) in &sx {
                    let c = [i, j, k];
                    if coarse.layout().contains(c) {
                        coarse.add(c, v * wx * wy * wz);
                    }
                }
            }
        }
    }
    coarse.invalidate_guards();
}

/// How interpolated values combine with the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combine {
    /// Replace the destination value.
    Overwrite,
    /// Add onto the destination value.
    Add,
}

/// Linearly interpolate `coarse` onto the points of `region` in `fine`.
///
/// `offset` is the coarse index of fine index 0. Coarse points outside the
/// valid region are read through [`sample`].
pub fn interpolate(
    coarse: &FieldArray,
    fine: &mut FieldArray,
    ratio: [usize; 3],
    offset: [i64; 3],
    region: IndexBox,
    combine: Combine,
    coarse_periodic: [bool; 3],
) {
    let stag = fine.staggering();
    let region = region.intersect(&fine.layout().allocated_box());
    for idx in region.iter() {
        let sx = interp_stencil(idx[0], ratio[0], offset[0], stag.offset(0));
        let sy = interp_stencil(idx[1], ratio[1], offset[1], stag.offset(1));
        let sz = interp_stencil(idx[2], ratio[2], offset[2], stag.offset(2));
        let mut v = 0.0;
        for &(k, wz) in &sz {
            for &(j, wy) in &sy {
                for &(i, wx) in &sx {
                    v += wx * wy * wz * sample(coarse, [i, j, k], coarse_periodic);
                }
            }
        }
        match combine {
            Combine::Overwrite => fine.set(idx, v),
            Combine::Add => fine.add(idx, v),
        }
    }
}

/// Fill the guard band of `fine` to width `w` by interpolation from `coarse`.
pub fn fill_guards_from_coarse(
    fine: &mut FieldArray,
    coarse: &FieldArray,
    ratio: [usize; 3],
    offset: [i64; 3],
    w: usize,
    coarse_periodic: [bool; 3],
) {
    let layout = *fine.layout();
    let stag = fine.staggering();
    for idx in layout.grown_box(w).iter() {
        if layout.is_valid_index(idx) {
            continue;
        }
        let sx = interp_stencil(idx[0], ratio[0], offset[0], stag.offset(0));
        let sy = interp_stencil(idx[1], ratio[1], offset[1], stag.offset(1));
        let sz = interp_stencil(idx[2], ratio[2], offset[2], stag.offset(2));
        let mut v = 0.0;
        for &(k, wz) in &sz {
            for &(j, wy) in &sy {
                for &(i, wx) in &sx {
                    v += wx * wy * wz * sample(coarse, [i, j, k], coarse_periodic);
                }
            }
        }
        fine.set(idx, v);
    }
    fine.mark_guards_filled(w);
}

/// Add every stored point of `src` into the valid region of `dst`, where
/// `src` index 0 sits at `dst` index `offset` (same resolution).
pub fn add_region(dst: &mut FieldArray, src: &FieldArray, offset: [i64; 3], periodic: [bool; 3]) {
    let dst_layout = *dst.layout();
    for idx in src.layout().allocated_box().iter() {
        let v = src.get(idx);
        if v == 0.0 {
            continue;
        }
        let target = [idx[0] + offset[0], idx[1] + offset[1], idx[2] + offset[2]];
        if let Some(t) = dst_layout.wrap_valid(target, periodic) {
            dst.add(t, v);
        }
    }
    dst.invalidate_guards();
}

/// Fill the guard band of `dst` to width `w` by copying from `src` at the
/// same resolution, where `dst` index 0 sits at `src` index `offset`.
pub fn copy_guards_from(
    dst: &mut FieldArray,
    src: &FieldArray,
    offset: [i64; 3],
    w: usize,
    src_periodic: [bool; 3],
) {
    let layout = *dst.layout();
    for idx in layout.grown_box(w).iter() {
        if layout.is_valid_index(idx) {
            continue;
        }
        let s = [idx[0] + offset[0], idx[1] + offset[1], idx[2] + offset[2]];
        dst.set(idx, sample(src, s, src_periodic));
    }
    dst.mark_guards_filled(w);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Layout;
    use corona_core::FieldKind;
    use proptest::prelude::*;

    const ACTIVE_XZ: [bool; 3] = [true, false, true];

    #[test]
    fn nodal_stencil_matches_quarter_half_quarter() {
        assert_eq!(restrict_stencil(4, 2, true).as_slice(), &[(2, 0.5)]);
        assert_eq!(
            restrict_stencil(5, 2, true).as_slice(),
            &[(2, 0.25), (3, 0.25)]
        );
        assert_eq!(restrict_stencil(-1, 2, true).as_slice(), &[(-1, 0.25), (0, 0.25)]);
        assert_eq!(restrict_stencil(5, 2, false).as_slice(), &[(2, 0.5)]);
        assert_eq!(restrict_stencil(7, 1, true).as_slice(), &[(7, 1.0)]);
    }

    #[test]
    fn interpolation_reproduces_linear_profiles() {
        // Coarse Ex (cell-centered in x, nodal in z) holds x + 2z in cell units.
        let coarse_layout = Layout::new([8, 1, 8], 2, ACTIVE_XZ);
        let mut coarse = FieldArray::with_layout(FieldKind::Ex, coarse_layout);
        for idx in coarse_layout.allocated_box().iter() {
            let x = idx[0] as f64 + 0.5;
            let z = idx[2] as f64;
            coarse.set(idx, x + 2.0 * z);
        }
        let fine_layout = Layout::new([8, 1, 8], 1, ACTIVE_XZ);
        let mut fine = FieldArray::with_layout(FieldKind::Ex, fine_layout);
        let offset = [2, 0, 2];
        interpolate(
            &coarse,
            &mut fine,
            [2, 1, 2],
            offset,
            fine_layout.valid_box(),
            Combine::Overwrite,
            [false; 3],
        );
        for idx in fine_layout.valid_box().iter() {
            let x = offset[0] as f64 + (idx[0] as f64 + 0.5) / 2.0;
            let z = offset[2] as f64 + idx[2] as f64 / 2.0;
            assert!((fine.get(idx) - (x + 2.0 * z)).abs() < 1e-12, "{idx:?}");
        }
    }

    #[test]
    fn add_region_wraps_into_periodic_valid_cells() {
        let mut dst = FieldArray::with_layout(FieldKind::Rho, Layout::new([4, 1, 4], 1, ACTIVE_XZ));
        let mut src = FieldArray::with_layout(FieldKind::Rho, Layout::new([2, 1, 2], 1, ACTIVE_XZ));
        src.set([-1, 0, 0], 1.0);
        add_region(&mut dst, &src, [0, 0, 1], [true, false, true]);
        assert_eq!(dst.get([3, 0, 1]), 1.0);
    }

    proptest! {
        #[test]
        fn restriction_conserves_total_charge(
            values in prop::collection::vec(-1.0f64..1.0, 1..12),
            nodal_x in any::<bool>(),
            nodal_z in any::<bool>(),
        ) {
            let fine_layout = Layout::new([8, 1, 8], 2, ACTIVE_XZ);
            let kind = match (nodal_x, nodal_z) {
                (true, true) => FieldKind::Rho,
                (false, true) => FieldKind::Jx,
                (true, false) => FieldKind::Jz,
                (false, false) => FieldKind::By,
            };
            let mut fine = FieldArray::with_layout(kind, fine_layout);
            let points: Vec<_> = fine_layout.allocated_box().iter().collect();
            for (n, v) in values.iter().enumerate() {
                let idx = points[(n * 37) % points.len()];
                fine.add(idx, *v);
            }
            let mut coarse = FieldArray::with_layout(kind, Layout::new([4, 1, 4], 3, ACTIVE_XZ));
            restrict(&fine, &mut coarse, [2, 1, 2]);

            let fine_total: f64 = fine.data().iter().sum::<f64>() * 1.0;
            // Coarse cells have four times the area of fine cells.
            let coarse_total: f64 = coarse.data().iter().sum::<f64>() * 4.0;
            prop_assert!((fine_total - coarse_total).abs() < 1e-12);
        }
    }
}
