//! Guard-cell fills and source synchronization across the hierarchy.
//!
//! Level-0 guards go through the [`DomainDecomposition`]. A refined fine
//! patch takes its guards from level 0 by interpolation, and its coarse
//! patch copies them from level 0 at the same resolution. Deposited
//! sources flow the other way: the fine current is restricted onto the
//! coarse patch, which is added into level 0 before the periodic guard sum.

use corona_core::{FieldSet, InvariantViolation};
use corona_grid::transfer;

use crate::collaborators::DomainDecomposition;
use crate::level::Level;

/// One patch of the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchId {
    /// Fine patch of a level.
    Fine(usize),
    /// Coarse patch of a refined level.
    Coarse(usize),
}

impl PatchId {
    /// Every patch of `levels`, level-0 fine patch first.
    pub fn all(num_levels: usize) -> Vec<PatchId> {
        let mut ids = vec![PatchId::Fine(0)];
        for lev in 1..num_levels {
            ids.push(PatchId::Fine(lev));
            ids.push(PatchId::Coarse(lev));
        }
        ids
    }
}

/// E and B.
pub fn em_set() -> FieldSet {
    FieldSet::ELECTRIC.union(&FieldSet::MAGNETIC)
}

fn out_of_range(level: usize, levels: &[Level]) -> InvariantViolation {
    InvariantViolation::LevelOutOfRange {
        level,
        finest: levels.len().saturating_sub(1),
    }
}

/// Fill the guards of `kinds` on patch `id` to width `w`. Kinds the patch
/// does not allocate are skipped.
pub fn fill_patch(
    levels: &mut [Level],
    id: PatchId,
    kinds: FieldSet,
    w: usize,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    let lev = match id {
        PatchId::Fine(l) | PatchId::Coarse(l) => l,
    };
    if lev >= levels.len() || id == PatchId::Coarse(0) {
        return Err(out_of_range(lev, levels));
    }
    let (base, rest) = levels.split_at_mut(1);
    let parent = &mut base[0].fp.fields;
    if lev == 0 {
        let periodic = parent.geom.periodic();
        for kind in kinds.iter() {
            if let Some(a) = parent.field_mut(kind) {
                dd.fill_boundary(a, w, periodic);
            }
        }
        return Ok(());
    }
    let level = &mut rest[lev - 1];
    let link = level.coarse.as_mut().ok_or(InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: 0,
    })?;
    let periodic = parent.geom.periodic();
    let offset = link.offset();
    for kind in kinds.iter() {
        let Some(src) = parent.field(kind) else {
            continue;
        };
        match id {
            PatchId::Fine(_) => {
                if let Some(dst) = level.fp.fields.field_mut(kind) {
                    transfer::fill_guards_from_coarse(dst, src, link.ratio, offset, w, periodic);
                }
            }
            PatchId::Coarse(_) => {
                if let Some(dst) = link.cp.fields.field_mut(kind) {
                    transfer::copy_guards_from(dst, src, offset, w, periodic);
                }
            }
        }
    }
    Ok(())
}

/// Fill `kinds` to width `w` on every patch, level 0 first.
pub fn fill_all(
    levels: &mut [Level],
    kinds: FieldSet,
    w: usize,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    for id in PatchId::all(levels.len()) {
        fill_patch(levels, id, kinds, w, dd)?;
    }
    Ok(())
}

/// Fill the guards of the level-0 time-averaged E and B, if allocated.
pub fn fill_averages(levels: &mut [Level], w: usize, dd: &dyn DomainDecomposition) {
    let Some(base) = levels.first_mut() else {
        return;
    };
    let fields = &mut base.fp.fields;
    let periodic = fields.geom.periodic();
    for avg in [fields.e_avg.as_mut(), fields.b_avg.as_mut()].into_iter().flatten() {
        for a in avg.iter_mut() {
            dd.fill_boundary(a, w, periodic);
        }
    }
}

/// Restrict the fine current of level `lev` onto its coarse patch, then
/// fold the fine patch's own guard contributions.
pub fn restrict_current(
    levels: &mut [Level],
    lev: usize,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    let len = levels.len();
    let level = levels.get_mut(lev).ok_or(InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: len.saturating_sub(1),
    })?;
    let link = level.coarse.as_mut().ok_or(InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: 0,
    })?;
    let fine = &mut level.fp.fields;
    let periodic = fine.geom.periodic();
    for (f, c) in fine.j.iter_mut().zip(link.cp.fields.j.iter_mut()) {
        transfer::restrict(f, c, link.ratio);
        dd.sum_boundary(f, periodic);
    }
    Ok(())
}

/// Restrict the fine rho slot `slot` of level `lev` onto its coarse patch.
pub fn restrict_rho(
    levels: &mut [Level],
    lev: usize,
    slot: usize,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    let len = levels.len();
    let level = levels.get_mut(lev).ok_or(InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: len.saturating_sub(1),
    })?;
    let link = level.coarse.as_mut().ok_or(InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: 0,
    })?;
    let fine = &mut level.fp.fields;
    let periodic = fine.geom.periodic();
    transfer::restrict(&fine.rho[slot], &mut link.cp.fields.rho[slot], link.ratio);
    dd.sum_boundary(&mut fine.rho[slot], periodic);
    Ok(())
}

/// Add the coarse-patch current of every refined level into level 0 and
/// fold the level-0 guards.
pub fn add_current_from_fine(levels: &mut [Level], dd: &dyn DomainDecomposition) {
    let Some((base, rest)) = levels.split_first_mut() else {
        return;
    };
    let fields = &mut base.fp.fields;
    let periodic = fields.geom.periodic();
    for level in rest.iter() {
        if let Some(link) = &level.coarse {
            for (dst, src) in fields.j.iter_mut().zip(&link.cp.fields.j) {
                transfer::add_region(dst, src, link.offset(), periodic);
            }
        }
    }
    for a in fields.j.iter_mut() {
        dd.sum_boundary(a, periodic);
    }
}

/// [`add_current_from_fine`] for rho slot `slot`.
pub fn add_rho_from_fine(levels: &mut [Level], slot: usize, dd: &dyn DomainDecomposition) {
    let Some((base, rest)) = levels.split_first_mut() else {
        return;
    };
    let fields = &mut base.fp.fields;
    let periodic = fields.geom.periodic();
    for level in rest.iter() {
        if let Some(link) = &level.coarse {
            transfer::add_region(&mut fields.rho[slot], &link.cp.fields.rho[slot], link.offset(), periodic);
        }
    }
    dd.sum_boundary(&mut fields.rho[slot], periodic);
}

/// Restrict, add and sum the current of every level.
pub fn sync_current(levels: &mut [Level], dd: &dyn DomainDecomposition) -> Result<(), InvariantViolation> {
    for lev in 1..levels.len() {
        restrict_current(levels, lev, dd)?;
    }
    add_current_from_fine(levels, dd);
    Ok(())
}

/// Restrict, add and sum rho slot `slot` of every level.
pub fn sync_rho(
    levels: &mut [Level],
    slot: usize,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    for lev in 1..levels.len() {
        restrict_rho(levels, lev, slot, dd)?;
    }
    add_rho_from_fine(levels, slot, dd);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::LocalDecomposition;
    use crate::config::SimConfig;
    use crate::level::build_levels;
    use corona_grid::IndexBox;

    fn two_levels() -> Vec<Level> {
        let mut cfg = SimConfig::default();
        cfg.grid.n_cells = [16, 1, 16];
        cfg.grid.dx = [1.0; 3];
        cfg.refinement.patch = Some(IndexBox::new([4, 0, 4], [8, 1, 12]));
        build_levels(&cfg, &[1.0e-9, 1.0e-9]).unwrap()
    }

    #[test]
    fn base_fill_goes_through_decomposition() {
        let mut levels = two_levels();
        levels[0].fp.fields.e[2].set([0, 0, 3], 1.5);
        fill_patch(&mut levels, PatchId::Fine(0), em_set(), 4, &LocalDecomposition).unwrap();
        let ez = &levels[0].fp.fields.e[2];
        assert_eq!(ez.guard_valid(), 4);
        assert_eq!(ez.get([16, 0, 3]), 1.5);
    }

    #[test]
    fn coarse_patch_guards_copy_level_zero() {
        let mut levels = two_levels();
        let base = &mut levels[0].fp.fields.b[1];
        for idx in base.layout().valid_box().iter() {
            base.set(idx, (idx[0] * 100 + idx[2]) as f64);
        }
        fill_all(&mut levels, em_set(), 2, &LocalDecomposition).unwrap();
        let cp = &levels[1].coarse.as_ref().unwrap().cp.fields.b[1];
        assert_eq!(cp.guard_valid(), 2);
        // cp index -1 sits at level-0 index 3.
        assert_eq!(cp.get([-1, 0, 0]), 304.0);
        assert!(levels[1].fp.fields.b[1].guard_valid() >= 2);
    }

    #[test]
    fn coarse_patch_fill_on_level_zero_is_rejected() {
        let mut levels = two_levels();
        let err = fill_patch(&mut levels, PatchId::Coarse(0), em_set(), 1, &LocalDecomposition);
        assert!(matches!(err, Err(InvariantViolation::LevelOutOfRange { .. })));
    }

    #[test]
    fn fine_current_reaches_level_zero_with_its_total() {
        let mut levels = two_levels();
        let jz = &mut levels[1].fp.fields.j[2];
        jz.set([3, 0, 5], 4.0);
        jz.set([4, 0, 6], 2.0);
        sync_current(&mut levels, &LocalDecomposition).unwrap();
        // Fine cells are half as wide on both active axes, so each fine
        // value carries a quarter of the coarse weight.
        let total = levels[0].fp.fields.j[2].sum_valid();
        assert!((total - 6.0 / 4.0).abs() < 1e-12, "{total}");
    }

    #[test]
    fn patch_ids_list_every_patch() {
        assert_eq!(PatchId::all(1), vec![PatchId::Fine(0)]);
        assert_eq!(
            PatchId::all(2),
            vec![PatchId::Fine(0), PatchId::Fine(1), PatchId::Coarse(1)]
        );
    }
}
