//! Field advance over a set of patches.
//!
//! FDTD updates interleave across the patches of one call so that a fine
//! patch fills its guards from a level 0 that has reached the same time.
//! Kinds a patch does not allocate (F, G without cleaning) are skipped by
//! the fills and by the solver.

use corona_core::{FieldKind, FieldSet, InvariantViolation, StepError};
use corona_grid::transfer::{self, Combine};
use corona_particles::ChargeSlot;
use corona_solver::fdtd::Half;
use corona_solver::{EmFields, FdtdSolver, FieldSolver};

use crate::collaborators::DomainDecomposition;
use crate::config::SimConfig;
use crate::guard_cells::{self, PatchId};
use crate::level::{Level, Patch, PatchSolver};
use crate::pic_step;
use crate::state::SimulationState;

/// Guard width the FDTD stencil reads.
const STENCIL: usize = 1;

fn kinds_e() -> FieldSet {
    FieldSet::ELECTRIC.with(FieldKind::G)
}

fn kinds_b() -> FieldSet {
    FieldSet::MAGNETIC.with(FieldKind::F)
}

fn kinds_all() -> FieldSet {
    kinds_e().union(&kinds_b())
}

/// Patch `id` of `levels`.
pub(crate) fn patch_mut(levels: &mut [Level], id: PatchId) -> Result<&mut Patch, InvariantViolation> {
    let finest = levels.len().saturating_sub(1);
    let out_of_range = |level| InvariantViolation::LevelOutOfRange { level, finest };
    match id {
        PatchId::Fine(l) => levels.get_mut(l).map(|lv| &mut lv.fp).ok_or(out_of_range(l)),
        PatchId::Coarse(l) => levels
            .get_mut(l)
            .and_then(|lv| lv.coarse.as_mut())
            .map(|c| &mut c.cp)
            .ok_or(out_of_range(l)),
    }
}

fn fill(
    levels: &mut [Level],
    ids: &[PatchId],
    kinds: FieldSet,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    for id in ids {
        guard_cells::fill_patch(levels, *id, kinds, STENCIL, dd)?;
    }
    Ok(())
}

/// Run `op` on every FDTD patch of `ids`.
fn each_fdtd<F>(levels: &mut [Level], ids: &[PatchId], mut op: F) -> Result<(), InvariantViolation>
where
    F: FnMut(&FdtdSolver, &mut EmFields) -> Result<(), InvariantViolation>,
{
    for id in ids {
        let patch = patch_mut(levels, *id)?;
        if let PatchSolver::Fdtd(solver) = &patch.solver {
            let solver = *solver;
            op(&solver, &mut patch.fields)?;
        }
    }
    Ok(())
}

/// One full leapfrog step of `dt`: B and F by half a step, G by half and E
/// by a full step, then F and B by the second half and G by the rest.
pub(crate) fn fdtd_full(
    levels: &mut [Level],
    ids: &[PatchId],
    dt: f64,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    let h = 0.5 * dt;
    fill(levels, ids, kinds_all(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_b(f, h)?;
        s.evolve_f(f, h, Half::First)
    })?;
    fill(levels, ids, kinds_b(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_g(f, h)?;
        s.evolve_e(f, dt)
    })?;
    fill(levels, ids, kinds_e(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_f(f, h, Half::Second)?;
        s.evolve_b(f, h)
    })?;
    fill(levels, ids, FieldSet::MAGNETIC, dd)?;
    each_fdtd(levels, ids, |s, f| s.evolve_g(f, h))
}

/// First half of a split step of total length `2*h`: B, F and G by `h`,
/// then E by `h` with the current in place.
pub(crate) fn fdtd_first_half(
    levels: &mut [Level],
    ids: &[PatchId],
    h: f64,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    fill(levels, ids, kinds_all(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_b(f, h)?;
        s.evolve_f(f, h, Half::First)
    })?;
    fill(levels, ids, kinds_b(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_g(f, h)?;
        s.evolve_e(f, h)
    })?;
    fill(levels, ids, kinds_e(), dd)
}

/// Second half of a split step: E by `h` with the current in place, then
/// F, B and G by `h`.
pub(crate) fn fdtd_second_half(
    levels: &mut [Level],
    ids: &[PatchId],
    h: f64,
    dd: &dyn DomainDecomposition,
) -> Result<(), InvariantViolation> {
    fill(levels, ids, kinds_b(), dd)?;
    each_fdtd(levels, ids, |s, f| s.evolve_e(f, h))?;
    fill(levels, ids, kinds_e(), dd)?;
    each_fdtd(levels, ids, |s, f| {
        s.evolve_f(f, h, Half::Second)?;
        s.evolve_b(f, h)
    })?;
    fill(levels, ids, FieldSet::MAGNETIC, dd)?;
    each_fdtd(levels, ids, |s, f| s.evolve_g(f, h))
}

/// Full spectral step on every PSATD patch of `ids`, with the sources
/// already deposited.
pub(crate) fn psatd_advance(levels: &mut [Level], ids: &[PatchId]) -> Result<(), InvariantViolation> {
    for id in ids {
        if let Some((solver, fields)) = patch_mut(levels, *id)?.psatd_mut() {
            solver.advance(fields)?;
        }
    }
    Ok(())
}

/// Advance every patch by `dt` with the configured solver.
pub(crate) fn advance_all(
    levels: &mut [Level],
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
    dt: f64,
) -> Result<(), StepError> {
    let ids = PatchId::all(levels.len());
    match cfg.solver.solver {
        FieldSolver::Fdtd => fdtd_full(levels, &ids, dt, dd)?,
        FieldSolver::Psatd => psatd_advance(levels, &ids)?,
        FieldSolver::Electrostatic | FieldSolver::None => {}
    }
    Ok(())
}

/// Deposit rho at the current positions, solve Poisson on level 0 and
/// hand the field to the refined level by interpolation.
pub(crate) fn space_charge(
    state: &mut SimulationState,
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
) -> Result<(), StepError> {
    let slot = ChargeSlot::New;
    for lev in 0..state.levels.len() {
        state.levels[lev].fp.fields.zero_rho(slot.index());
        pic_step::deposit_rho(state, cfg, lev, slot, 0.0)?;
    }
    guard_cells::sync_rho(&mut state.levels, slot.index(), dd)?;

    let Some((base, rest)) = state.levels.split_first_mut() else {
        return Ok(());
    };
    if let PatchSolver::Electrostatic(solver) = &base.fp.solver {
        solver.solve(&mut base.fp.fields)?;
    }
    let parent = &mut base.fp.fields;
    let periodic = parent.geom.periodic();
    for a in parent.e.iter_mut() {
        let ng = a.layout().max_ng();
        dd.fill_boundary(a, ng, periodic);
    }
    for level in rest.iter_mut() {
        let Some(link) = level.coarse.as_mut() else {
            continue;
        };
        let offset = link.offset();
        for (c, src) in parent.e.iter().enumerate() {
            let fine = &mut level.fp.fields.e[c];
            let region = fine.layout().allocated_box();
            transfer::interpolate(src, fine, link.ratio, offset, region, Combine::Overwrite, periodic);
            fine.mark_guards_filled(fine.layout().max_ng());
            let cp = &mut link.cp.fields.e[c];
            let region = cp.layout().allocated_box();
            transfer::interpolate(src, cp, [1; 3], offset, region, Combine::Overwrite, periodic);
            cp.mark_guards_filled(cp.layout().max_ng());
        }
        for b in level.fp.fields.b.iter_mut().chain(link.cp.fields.b.iter_mut()) {
            b.fill(0.0);
        }
    }
    Ok(())
}
