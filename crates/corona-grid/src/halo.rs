//! Single-patch guard-cell operations.
//!
//! These are the local kernels behind the domain-decomposition
//! collaborator: with a single patch per level, filling guards means
//! wrapping periodic axes and zero-filling non-periodic ones, and summing
//! guards means folding deposited guard contributions back into the valid
//! cells they alias.

use crate::array::FieldArray;

/// Fill guards of `a` to width `w` from its own valid region.
///
/// Periodic axes wrap; points outside a non-periodic face are set to zero.
/// On return `a.guard_valid() >= w` (clamped to the allocated width).
pub fn fill_boundary(a: &mut FieldArray, w: usize, periodic: [bool; 3]) {
    let layout = *a.layout();
    for idx in layout.grown_box(w).iter() {
        if layout.is_valid_index(idx) {
            continue;
        }
        let v = match layout.wrap_valid(idx, periodic) {
            Some(src) => a.get(src),
            None => 0.0,
        };
        a.set(idx, v);
    }
    a.mark_guards_filled(w);
}

/// Fold every guard value into the valid point it aliases under
/// periodicity, then zero the guards.
///
/// Guard contributions beyond a non-periodic face are discarded. Guards are
/// left stale; callers refill before any stage reads them.
pub fn sum_boundary(a: &mut FieldArray, periodic: [bool; 3]) {
    let layout = *a.layout();
    for idx in layout.allocated_box().iter() {
        if layout.is_valid_index(idx) {
            continue;
        }
        let v = a.get(idx);
        if v != 0.0 {
            if let Some(dst) = layout.wrap_valid(idx, periodic) {
                a.add(dst, v);
            }
            a.set(idx, 0.0);
        }
    }
    a.invalidate_guards();
}
