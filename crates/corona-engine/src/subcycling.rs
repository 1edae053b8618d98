//! Two-level step with a sub-cycled fine patch.
//!
//! The fine level takes two steps of `dt[1] = dt[0]/2` per coarse step.
//! Level 0 and the coarse patch advance in two halves so that each half
//! sees the fine current restricted from the matching fine step.

use std::time::Instant;

use tracing::debug;

use corona_core::StepError;
use corona_particles::ChargeSlot;

use crate::aux_fields::update_aux;
use crate::collaborators::DomainDecomposition;
use crate::config::SimConfig;
use crate::field_advance::{fdtd_first_half, fdtd_full, fdtd_second_half};
use crate::guard_cells::{self, em_set, PatchId};
use crate::metrics::{micros, StepMetrics};
use crate::pic_step;
use crate::state::SimulationState;

const FINE: usize = 1;

/// Fine push and deposit, restriction onto the coarse patch, and a full
/// fine-patch field step.
fn fine_step(
    state: &mut SimulationState,
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
    with_rho: bool,
    metrics: &mut StepMetrics,
) -> Result<(), StepError> {
    let dt1 = state.time.dt[FINE];
    let start = Instant::now();
    pic_step::push_and_deposit(state, cfg, FINE, dt1, with_rho)?;
    guard_cells::restrict_current(&mut state.levels, FINE, dd)?;
    if with_rho {
        guard_cells::restrict_rho(&mut state.levels, FINE, ChargeSlot::Old.index(), dd)?;
        guard_cells::restrict_rho(&mut state.levels, FINE, ChargeSlot::New.index(), dd)?;
    }
    metrics.push_deposit_us += micros(start);

    let start = Instant::now();
    fdtd_full(&mut state.levels, &[PatchId::Fine(FINE)], dt1, dd)?;
    metrics.field_solve_us += micros(start);
    Ok(())
}

fn add_fine_sources(state: &mut SimulationState, dd: &dyn DomainDecomposition, with_rho: bool) {
    guard_cells::add_current_from_fine(&mut state.levels, dd);
    if with_rho {
        guard_cells::add_rho_from_fine(&mut state.levels, ChargeSlot::Old.index(), dd);
        guard_cells::add_rho_from_fine(&mut state.levels, ChargeSlot::New.index(), dd);
    }
}

/// One coarse step of a two-level hierarchy.
pub(crate) fn one_step_sub1(
    state: &mut SimulationState,
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
    metrics: &mut StepMetrics,
) -> Result<(), StepError> {
    let with_rho = pic_step::needs_rho(cfg);
    let dt0 = state.time.dt[0];
    let dt1 = state.time.dt[FINE];

    debug!(dt0, dt1, "subcycled step, first fine half");
    fine_step(state, cfg, dd, with_rho, metrics)?;

    let start = Instant::now();
    pic_step::push_and_deposit(state, cfg, 0, dt0, with_rho)?;
    let stored_j = state.levels[0].fp.fields.j.clone();
    let stored_rho = with_rho.then(|| state.levels[0].fp.fields.rho.clone());
    add_fine_sources(state, dd, with_rho);
    metrics.push_deposit_us += micros(start);

    let start = Instant::now();
    fdtd_first_half(&mut state.levels, &[PatchId::Coarse(FINE)], dt1, dd)?;
    fdtd_first_half(&mut state.levels, &[PatchId::Fine(0)], 0.5 * dt0, dd)?;
    guard_cells::fill_all(&mut state.levels, em_set(), cfg.gather_width(), dd)?;
    update_aux(&mut state.levels)?;
    metrics.field_solve_us += micros(start);

    debug!("subcycled step, second fine half");
    fine_step(state, cfg, dd, with_rho, metrics)?;

    let start = Instant::now();
    state.levels[0].fp.fields.j = stored_j;
    if let Some(rho) = stored_rho {
        state.levels[0].fp.fields.rho = rho;
    }
    add_fine_sources(state, dd, with_rho);
    fdtd_second_half(&mut state.levels, &[PatchId::Coarse(FINE)], dt1, dd)?;
    fdtd_second_half(&mut state.levels, &[PatchId::Fine(0)], 0.5 * dt0, dd)?;
    metrics.field_solve_us += micros(start);

    state.time.istep[FINE] = state.time.istep[FINE].next().next();
    state.time.t_new[FINE] += 2.0 * dt1;
    Ok(())
}
