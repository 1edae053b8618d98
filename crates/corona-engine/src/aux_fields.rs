//! Gather fields of refined levels.
//!
//! `aux1 = fp1 + interp(fp0 - cp1)`: the fine solution plus the part of
//! the level-0 solution the coarse patch does not already represent. Far
//! from the patch edge `fp0` and `cp1` agree and `aux1` is just `fp1`.

use corona_core::InvariantViolation;
use corona_grid::transfer::{self, Combine};
use corona_grid::FieldArray;
use corona_particles::FieldRefs;

use crate::level::Level;

/// `aux = fine + interp(sample(parent) - coarse)` for one component.
fn update_component(
    aux: &mut FieldArray,
    fine: &FieldArray,
    coarse: &FieldArray,
    parent: &FieldArray,
    ratio: [usize; 3],
    offset: [i64; 3],
    periodic: [bool; 3],
) -> Result<(), InvariantViolation> {
    aux.copy_from(fine)?;
    let mut diff = coarse.clone();
    for idx in coarse.layout().allocated_box().iter() {
        let p = [idx[0] + offset[0], idx[1] + offset[1], idx[2] + offset[2]];
        diff.set(idx, transfer::sample(parent, p, periodic) - coarse.get(idx));
    }
    let region = aux.layout().allocated_box();
    transfer::interpolate(&diff, aux, ratio, [0; 3], region, Combine::Add, [false; 3]);
    Ok(())
}

/// Recompute the aux fields of every refined level. Guards of the fine and
/// coarse patches must already be filled; aux inherits the fine patch's
/// guard validity.
pub fn update_aux(levels: &mut [Level]) -> Result<(), InvariantViolation> {
    let Some((base, rest)) = levels.split_first_mut() else {
        return Ok(());
    };
    let parent = &base.fp.fields;
    let periodic = parent.geom.periodic();
    for level in rest.iter_mut() {
        let Some(link) = level.coarse.as_mut() else {
            continue;
        };
        let offset = link.offset();
        let fine = &level.fp.fields;
        let cp = &link.cp.fields;
        for c in 0..3 {
            update_component(&mut link.aux.e[c], &fine.e[c], &cp.e[c], &parent.e[c], link.ratio, offset, periodic)?;
            update_component(&mut link.aux.b[c], &fine.b[c], &cp.b[c], &parent.b[c], link.ratio, offset, periodic)?;
        }
    }
    Ok(())
}

/// The fields particles of level `lev` gather from: level 0 reads its own
/// fine patch (or the time averages when `averaged`), refined levels read
/// aux.
pub fn gather_refs(level: &Level, averaged: bool) -> FieldRefs<'_> {
    let fields = &level.fp.fields;
    let geom = &fields.geom;
    if let Some(link) = &level.coarse {
        return FieldRefs::new(geom, link.aux.e.each_ref(), link.aux.b.each_ref());
    }
    match (averaged, &fields.e_avg, &fields.b_avg) {
        (true, Some(e), Some(b)) => FieldRefs::new(geom, e.each_ref(), b.each_ref()),
        _ => FieldRefs::new(geom, fields.e.each_ref(), fields.b.each_ref()),
    }
}
