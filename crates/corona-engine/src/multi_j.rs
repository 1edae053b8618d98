//! Spectral step with several current depositions per step.
//!
//! Particles are pushed once by the full `dt`. The step is then cut into
//! `n_depose` spectral sub-steps, each fed by a current deposited over its
//! own window, expressed relative to the pushed positions. With time
//! averaging the loop runs twice as long and the gather reads the
//! trapezoidal average of E and B over `[t, t + 2 dt]`.

use std::time::Instant;

use tracing::debug;

use corona_core::{InvariantViolation, StepError};
use corona_particles::ChargeSlot;
use corona_solver::{EmFields, PsatdSolver, SpectralSlot};

use crate::collaborators::DomainDecomposition;
use crate::config::SimConfig;
use crate::field_advance::patch_mut;
use crate::guard_cells::{self, PatchId};
use crate::level::Level;
use crate::metrics::{micros, StepMetrics};
use crate::pic_step::{self, DepositWindow};
use crate::state::SimulationState;

/// Run `op` on every spectral patch of the hierarchy.
fn each_psatd<F>(levels: &mut [Level], mut op: F) -> Result<(), InvariantViolation>
where
    F: FnMut(&mut PsatdSolver, &mut EmFields) -> Result<(), InvariantViolation>,
{
    for id in PatchId::all(levels.len()) {
        if let Some((solver, fields)) = patch_mut(levels, id)?.psatd_mut() {
            op(solver, fields)?;
        }
    }
    Ok(())
}

/// Zero J on every level, deposit over `window` and synchronize.
fn deposit_current_all(
    state: &mut SimulationState,
    cfg: &SimConfig,
    window: DepositWindow,
    dd: &dyn DomainDecomposition,
) -> Result<(), StepError> {
    for lev in 0..state.levels.len() {
        state.levels[lev].fp.fields.zero_current();
        pic_step::deposit_current(state, cfg, lev, window)?;
    }
    guard_cells::sync_current(&mut state.levels, dd)?;
    Ok(())
}

/// Zero the new rho slot on every level, deposit at `time` and
/// synchronize.
fn deposit_rho_all(
    state: &mut SimulationState,
    cfg: &SimConfig,
    time: f64,
    dd: &dyn DomainDecomposition,
) -> Result<(), StepError> {
    let slot = ChargeSlot::New;
    for lev in 0..state.levels.len() {
        state.levels[lev].fp.fields.zero_rho(slot.index());
        pic_step::deposit_rho(state, cfg, lev, slot, time)?;
    }
    guard_cells::sync_rho(&mut state.levels, slot.index(), dd)?;
    Ok(())
}

/// Deposit time of sub-step `i` of `n`, relative to the pushed positions.
/// A linear-in-time current is sampled at the sub-step end, a constant one
/// at its middle.
pub(crate) fn current_time(i: usize, n: usize, sub_dt: f64, j_linear: bool) -> f64 {
    let k = i as f64 - n as f64;
    if j_linear {
        (k + 1.0) * sub_dt
    } else {
        (k + 0.5) * sub_dt
    }
}

/// Charge deposit time of sub-step `i` of `n`: the sub-step end.
pub(crate) fn rho_time(i: usize, n: usize, sub_dt: f64) -> f64 {
    (i as f64 - n as f64 + 1.0) * sub_dt
}

/// One multi-J step of the whole hierarchy.
pub(crate) fn one_step_multi_j(
    state: &mut SimulationState,
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
    metrics: &mut StepMetrics,
) -> Result<(), StepError> {
    let opts = cfg.psatd.solver_options(&cfg.solver, &cfg.deposition);
    let n = cfg.psatd.n_depose;
    let dt = state.time.dt[0];
    let sub_dt = dt / n as f64;
    let with_rho = opts.needs_rho();
    let loops = if opts.time_averaging { 2 * n } else { n };
    debug!(n_depose = n, loops, sub_dt, "multi-J step");

    let start = Instant::now();
    for lev in 0..state.levels.len() {
        let dt = state.time.dt[lev];
        pic_step::push_particles(state, cfg, lev, dt)?;
    }
    metrics.push_deposit_us += micros(start);

    let start = Instant::now();
    each_psatd(&mut state.levels, |s, f| {
        s.forward_fields(f)?;
        if opts.time_averaging {
            s.erase_averages();
        }
        Ok(())
    })?;
    if with_rho {
        deposit_rho_all(state, cfg, -dt, dd)?;
        each_psatd(&mut state.levels, |s, f| s.forward_rho(f, SpectralSlot::New))?;
    }
    if opts.j_linear {
        deposit_current_all(state, cfg, DepositWindow::centered(-dt, sub_dt), dd)?;
        each_psatd(&mut state.levels, |s, f| s.forward_current(f, SpectralSlot::New))?;
    }

    let transform_current = opts.current_correction || opts.vay_deposition;
    for i in 0..loops {
        if opts.j_linear {
            each_psatd(&mut state.levels, |s, _| {
                s.move_current_new_to_old();
                Ok(())
            })?;
        }
        let t_j = current_time(i, n, sub_dt, opts.j_linear);
        deposit_current_all(state, cfg, DepositWindow::centered(t_j, sub_dt), dd)?;
        each_psatd(&mut state.levels, |s, f| s.forward_current(f, SpectralSlot::New))?;

        if with_rho {
            each_psatd(&mut state.levels, |s, _| {
                s.move_rho_new_to_old();
                Ok(())
            })?;
            deposit_rho_all(state, cfg, rho_time(i, n, sub_dt), dd)?;
            each_psatd(&mut state.levels, |s, f| s.forward_rho(f, SpectralSlot::New))?;
        }
        if opts.current_correction {
            each_psatd(&mut state.levels, |s, _| {
                s.current_correction();
                Ok(())
            })?;
        }
        each_psatd(&mut state.levels, |s, _| {
            s.push_spectral();
            Ok(())
        })?;
        if i + 1 == n {
            each_psatd(&mut state.levels, |s, f| {
                s.backward_fields(f)?;
                if transform_current {
                    s.backward_current(f)?;
                }
                Ok(())
            })?;
        }
    }
    if opts.time_averaging {
        let scale = 1.0 / (2.0 * dt);
        each_psatd(&mut state.levels, |s, f| s.backward_averages(f, scale))?;
    }
    metrics.field_solve_us += micros(start);
    Ok(())
}
