//! Particle push and deposition on one level, and the single-level step.

use std::time::Instant;

use rayon::prelude::*;

use corona_core::StepError;
use corona_particles::{ChargeDeposition, ChargeSlot, CurrentDeposition, PushParams};

use crate::aux_fields::gather_refs;
use crate::collaborators::DomainDecomposition;
use crate::config::SimConfig;
use crate::costs::CostMode;
use crate::field_advance;
use crate::guard_cells;
use crate::metrics::{micros, StepMetrics};
use crate::state::SimulationState;

/// Where the current deposition window sits relative to the particles'
/// stored positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DepositWindow {
    /// Window length, s.
    pub dt: f64,
    /// Time from the stored positions to the window end, s.
    pub shift: f64,
}

impl DepositWindow {
    /// The window of a standard step: the interval that just ended.
    pub fn trailing(dt: f64) -> Self {
        Self { dt, shift: 0.0 }
    }

    /// A window of length `dt` centered at `t` relative to the stored
    /// positions.
    pub fn centered(t: f64, dt: f64) -> Self {
        Self {
            dt,
            shift: t + 0.5 * dt,
        }
    }
}

fn push_params(cfg: &SimConfig, lev: usize) -> PushParams {
    PushParams {
        pusher: cfg.deposition.pusher,
        order: cfg.deposition.order,
        gather_ng: cfg.gather_width(),
        level: lev,
    }
}

fn gathers_averages(cfg: &SimConfig) -> bool {
    cfg.psatd.do_multi_j && cfg.psatd.time_averaging
}

fn record_cost(state: &mut SimulationState, cfg: &SimConfig, lev: usize, us: u64) {
    if cfg.load_balance.cost_mode == CostMode::Timers {
        state.costs.record_timers(lev, &state.species, us as f64);
    }
}

/// Advance momenta on level `lev` by `dt` through the gather fields.
pub(crate) fn push_momentum(
    state: &mut SimulationState,
    cfg: &SimConfig,
    lev: usize,
    dt: f64,
) -> Result<(), StepError> {
    let SimulationState { levels, species, .. } = state;
    let level = levels.get(lev).ok_or(corona_core::InvariantViolation::LevelOutOfRange {
        level: lev,
        finest: levels.len().saturating_sub(1),
    })?;
    let refs = gather_refs(level, gathers_averages(cfg));
    let params = push_params(cfg, lev);
    species
        .par_iter_mut()
        .try_for_each(|c| c.push_momentum(lev, &refs, dt, &params))?;
    Ok(())
}

/// Momentum then position push on level `lev`, without deposition.
pub(crate) fn push_particles(
    state: &mut SimulationState,
    cfg: &SimConfig,
    lev: usize,
    dt: f64,
) -> Result<(), StepError> {
    let start = Instant::now();
    {
        let SimulationState { levels, species, .. } = &mut *state;
        let level = levels.get(lev).ok_or(corona_core::InvariantViolation::LevelOutOfRange {
            level: lev,
            finest: levels.len().saturating_sub(1),
        })?;
        let refs = gather_refs(level, gathers_averages(cfg));
        let params = push_params(cfg, lev);
        species
            .par_iter_mut()
            .try_for_each(|c| c.push(lev, &refs, dt, &params))?;
    }
    record_cost(state, cfg, lev, micros(start));
    Ok(())
}

/// Deposit the current of every species on level `lev` into its fine
/// patch, over `window`. The arrays are not zeroed first.
pub(crate) fn deposit_current(
    state: &mut SimulationState,
    cfg: &SimConfig,
    lev: usize,
    window: DepositWindow,
) -> Result<(), StepError> {
    let SimulationState { levels, species, .. } = state;
    let fields = &mut levels[lev].fp.fields;
    let mut params = CurrentDeposition::new(&fields.geom, cfg.deposition.algorithm, cfg.deposition.order, window.dt);
    params.window_shift = window.shift;
    params.galilean_velocity = cfg.psatd.galilean_velocity;
    params.accumulation = cfg.deposition.accumulation;
    params.level = lev;
    let [jx, jy, jz] = &mut fields.j;
    for c in species.iter() {
        c.deposit_current(lev, [&mut *jx, &mut *jy, &mut *jz], &params)?;
    }
    Ok(())
}

/// Deposit the charge of every species on level `lev` into rho slot
/// `slot`, at `time` relative to the stored positions. The slot is not
/// zeroed first.
pub(crate) fn deposit_rho(
    state: &mut SimulationState,
    cfg: &SimConfig,
    lev: usize,
    slot: ChargeSlot,
    time: f64,
) -> Result<(), StepError> {
    let SimulationState { levels, species, .. } = state;
    let fields = &mut levels[lev].fp.fields;
    let mut params = ChargeDeposition::new(&fields.geom, cfg.deposition.order);
    params.time = time;
    params.accumulation = cfg.deposition.accumulation;
    params.level = lev;
    for c in species.iter() {
        c.deposit_charge(lev, &mut fields.rho, &params, slot)?;
    }
    Ok(())
}

/// Whether this configuration needs deposited rho every step.
pub(crate) fn needs_rho(cfg: &SimConfig) -> bool {
    let spectral_rho = cfg.solver.solver.is_spectral()
        && cfg.psatd.solver_options(&cfg.solver, &cfg.deposition).needs_rho();
    spectral_rho || cfg.solver.div_e_cleaning
}

/// Standard push and deposit on level `lev`: rho at the old positions,
/// the push, the current over the step, rho at the new positions.
pub(crate) fn push_and_deposit(
    state: &mut SimulationState,
    cfg: &SimConfig,
    lev: usize,
    dt: f64,
    with_rho: bool,
) -> Result<(), StepError> {
    if lev >= state.levels.len() {
        return Err(corona_core::InvariantViolation::LevelOutOfRange {
            level: lev,
            finest: state.finest_level(),
        }
        .into());
    }
    state.levels[lev].fp.fields.zero_current();
    if with_rho {
        state.levels[lev].fp.fields.zero_rho(ChargeSlot::Old.index());
        deposit_rho(state, cfg, lev, ChargeSlot::Old, 0.0)?;
    }
    push_particles(state, cfg, lev, dt)?;
    deposit_current(state, cfg, lev, DepositWindow::trailing(dt))?;
    if with_rho {
        state.levels[lev].fp.fields.zero_rho(ChargeSlot::New.index());
        deposit_rho(state, cfg, lev, ChargeSlot::New, 0.0)?;
    }
    Ok(())
}

/// One step without subcycling: every level pushes by its own dt, sources
/// are synchronized down to level 0, and every patch advances its fields.
pub(crate) fn one_step_nosub(
    state: &mut SimulationState,
    cfg: &SimConfig,
    dd: &dyn DomainDecomposition,
    metrics: &mut StepMetrics,
) -> Result<(), StepError> {
    let with_rho = needs_rho(cfg);
    let start = Instant::now();
    for lev in 0..state.levels.len() {
        let dt = state.time.dt[lev];
        push_and_deposit(state, cfg, lev, dt, with_rho)?;
    }
    guard_cells::sync_current(&mut state.levels, dd)?;
    if with_rho {
        guard_cells::sync_rho(&mut state.levels, ChargeSlot::Old.index(), dd)?;
        guard_cells::sync_rho(&mut state.levels, ChargeSlot::New.index(), dd)?;
    }
    metrics.push_deposit_us += micros(start);

    let start = Instant::now();
    let dt = state.time.dt[0];
    field_advance::advance_all(&mut state.levels, cfg, dd, dt)?;
    metrics.field_solve_us += micros(start);
    Ok(())
}
