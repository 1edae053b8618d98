//! The time-advance loop.
//!
//! [`Simulation`] owns the [`SimulationState`] and the four collaborators
//! and runs the per-step state machine: load balance, guard fills and the
//! half-step momentum offset, physics hooks, the push/deposit/field
//! dispatch, resynchronization on the last step, then the clock, window,
//! redistribution and boundary bookkeeping.
//!
//! # Leapfrog protocol
//!
//! Positions and fields live on integer steps. Between the first step of a
//! run and the last, momenta live on half steps: the first step moves them
//! back by `dt/2` and clears
//! [`is_synchronized`](crate::SimulationTimeState::is_synchronized), and a
//! step that ends the run moves them forward by `dt/2` and sets it again.
//!
//! # Failure
//!
//! Every error is fatal. The failing [`evolve`](Simulation::evolve) call
//! returns it, and every later call returns [`StepError::Aborted`].

use std::time::Instant;

use tracing::{debug, error, info, warn};

use corona_core::{ConfigIncompatibility, InvariantViolation, StepError};
use corona_grid::Geometry;
use corona_particles::{
    CurrentAlgorithm, ParticleContainer, ParticleData, RedistributeStats, Species,
};
use corona_solver::FieldSolver;

use crate::aux_fields::update_aux;
use crate::collaborators::{
    DefaultParticleBoundaries, Diagnostics, DomainDecomposition, LocalDecomposition, NoDiagnostics,
    NoPhysics, ParticleBoundary, PhysicsModules,
};
use crate::config::{ConfigError, SimConfig};
use crate::costs::{CostMode, Costs};
use crate::field_advance;
use crate::guard_cells::{em_set, fill_all, fill_averages};
use crate::level::build_levels;
use crate::metrics::{micros, StepMetrics};
use crate::mirrors;
use crate::moving_window::{shift_galilean, WindowState};
use crate::multi_j;
use crate::pic_step;
use crate::state::{SimulationState, SimulationTimeState};
use crate::subcycling;

// Compile-time assertion: Simulation can move to another thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

/// Which one-step routine a step runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPath {
    /// Push only; fields come from the Poisson solve.
    Electrostatic,
    /// Spectral step with several depositions.
    MultiJ,
    /// All levels advance together.
    NoSubcycling,
    /// Two levels with a sub-cycled fine patch.
    Subcycling,
}

/// The one-step routine for `cfg` on a hierarchy whose finest level is
/// `finest`.
pub fn step_path(cfg: &SimConfig, finest: usize) -> StepPath {
    if cfg.solver.solver == FieldSolver::Electrostatic {
        StepPath::Electrostatic
    } else if cfg.psatd.do_multi_j {
        StepPath::MultiJ
    } else if !cfg.refinement.subcycling || finest == 0 {
        StepPath::NoSubcycling
    } else {
        StepPath::Subcycling
    }
}

/// Reject algorithm combinations that have no one-step routine.
pub fn check_compatibility(cfg: &SimConfig, finest: usize) -> Result<(), ConfigIncompatibility> {
    let spectral = cfg.solver.solver.is_spectral();
    let algorithm = cfg.deposition.algorithm;
    if cfg.psatd.do_multi_j && !spectral {
        return Err(ConfigIncompatibility::MultiJNonSpectral);
    }
    if algorithm == CurrentAlgorithm::Vay && !spectral {
        return Err(ConfigIncompatibility::VayWithoutSpectral);
    }
    if cfg.psatd.current_correction {
        if !spectral {
            return Err(ConfigIncompatibility::CurrentCorrectionNonSpectral);
        }
        if algorithm == CurrentAlgorithm::Esirkepov {
            return Err(ConfigIncompatibility::CurrentCorrectionWithEsirkepov);
        }
    }
    if cfg.psatd.is_galilean() && algorithm.is_charge_conserving() {
        return Err(ConfigIncompatibility::ChargeConservingWithGalilean {
            algorithm: algorithm.name(),
        });
    }
    if cfg.refinement.subcycling && finest > 0 {
        if finest != 1 {
            return Err(ConfigIncompatibility::SubcyclingLevels { levels: finest + 1 });
        }
        if cfg.solver.solver == FieldSolver::Electrostatic {
            return Err(ConfigIncompatibility::SubcyclingElectrostatic);
        }
        if cfg.refinement.ratio != 2 {
            return Err(ConfigIncompatibility::SubcyclingRefRatio {
                ratio: cfg.refinement.ratio,
            });
        }
        if spectral {
            return Err(ConfigIncompatibility::SubcyclingSpectral);
        }
    }
    Ok(())
}

fn inside(geom: &Geometry, pos: [f64; 3]) -> bool {
    let lo = geom.prob_lo();
    let hi = geom.prob_hi();
    (0..3).all(|d| !geom.active(d) || (pos[d] >= lo[d] && pos[d] < hi[d]))
}

/// A particle-in-cell run.
///
/// Created from a validated [`SimConfig`] and a list of species. The
/// collaborators default to a single-process decomposition, no diagnostics,
/// the configured particle boundaries, and no extra physics; the `with_*`
/// builders replace them.
pub struct Simulation {
    config: SimConfig,
    state: SimulationState,
    decomposition: Box<dyn DomainDecomposition>,
    diagnostics: Box<dyn Diagnostics>,
    boundaries: Box<dyn ParticleBoundary>,
    physics: Box<dyn PhysicsModules>,
    window: WindowState,
    step: u64,
    last_metrics: StepMetrics,
    poisoned: bool,
    space_charge_ready: bool,
}

impl Simulation {
    /// Validate `config`, build the level hierarchy and register one
    /// particle container per entry of `species`.
    pub fn new(config: SimConfig, species: Vec<Species>) -> Result<Self, ConfigError> {
        config.validate()?;
        let dt0 = config.time.dt;
        let mut dt = vec![dt0];
        if config.refinement.patch.is_some() {
            let dt1 = if config.refinement.subcycling {
                dt0 / config.refinement.ratio as f64
            } else {
                dt0
            };
            dt.push(dt1);
        }
        let levels = build_levels(&config, &dt)?;
        let num_levels = levels.len();
        let base_lo = levels[0].geom().prob_lo();
        let window = WindowState::new(base_lo.get(config.moving_window.axis).copied().unwrap_or(0.0));
        let tile_size = config.grid.tile_size;
        let species = species
            .into_iter()
            .map(|s| ParticleContainer::with_tile_size(s, num_levels, tile_size))
            .collect();
        let boundaries = DefaultParticleBoundaries::from(&config.particle_boundaries);
        Ok(Self {
            state: SimulationState {
                time: SimulationTimeState::new(dt),
                levels,
                species,
                costs: Costs::new(num_levels),
            },
            config,
            decomposition: Box::new(LocalDecomposition),
            diagnostics: Box::new(NoDiagnostics),
            boundaries: Box::new(boundaries),
            physics: Box::new(NoPhysics),
            window,
            step: 0,
            last_metrics: StepMetrics::default(),
            poisoned: false,
            space_charge_ready: false,
        })
    }

    /// Replace the domain decomposition.
    pub fn with_decomposition(mut self, dd: impl DomainDecomposition + 'static) -> Self {
        self.decomposition = Box::new(dd);
        self
    }

    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Replace the particle boundary handler.
    pub fn with_boundaries(mut self, boundaries: impl ParticleBoundary + 'static) -> Self {
        self.boundaries = Box::new(boundaries);
        self
    }

    /// Replace the physics modules.
    pub fn with_physics(mut self, physics: impl PhysicsModules + 'static) -> Self {
        self.physics = Box::new(physics);
        self
    }

    /// The configuration the run was built from.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Fields, particles and clock.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Mutable state, for setting up initial fields and particles.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Steps completed so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Metrics of the last completed step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Whether an earlier error stopped the run.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Add a particle of species `species`, on level 1 when it lies inside
    /// the refined patch. Returns the particle id.
    pub fn add_particle(&mut self, species: usize, p: ParticleData) -> Result<i64, InvariantViolation> {
        let count = self.state.species.len();
        let SimulationState {
            levels,
            species: containers,
            ..
        } = &mut self.state;
        let container = containers
            .get_mut(species)
            .ok_or(InvariantViolation::UnknownSpecies { index: species, count })?;
        let lev = match levels.get(1) {
            Some(fine) if inside(fine.geom(), p.pos) => 1,
            _ => 0,
        };
        container.add_particle(lev, levels[lev].geom(), p)
    }

    /// Run until step `max_steps` or the configured stop time.
    ///
    /// # Errors
    ///
    /// Returns the first [`StepError`] a stage raises. The simulation is
    /// then poisoned and later calls return [`StepError::Aborted`].
    pub fn evolve(&mut self, max_steps: u64) -> Result<(), StepError> {
        if self.poisoned {
            return Err(StepError::Aborted);
        }
        let result = self.run(max_steps);
        if let Err(e) = &result {
            error!(step = self.step, error = %e, "step failed, simulation stopped");
            self.poisoned = true;
        }
        result
    }

    /// Run for the configured `max_steps`.
    pub fn evolve_configured(&mut self) -> Result<(), StepError> {
        self.evolve(self.config.time.max_steps)
    }

    fn stop_reached(&self) -> bool {
        let dt = self.state.time.dt[0];
        self.state.time.cur_time >= self.config.time.stop_time - 1e-3 * dt
    }

    fn run(&mut self, max_steps: u64) -> Result<(), StepError> {
        while self.step < max_steps && !self.stop_reached() {
            self.one_step(max_steps)?;
        }
        self.diagnostics.flush_last(&self.state);
        Ok(())
    }

    fn one_step(&mut self, max_steps: u64) -> Result<(), StepError> {
        let step_start = Instant::now();
        let mut metrics = StepMetrics::default();
        let cfg = &self.config;
        let dd = self.decomposition.as_ref();
        let state = &mut self.state;
        let finest = state.finest_level();
        let dt0 = state.time.dt[0];

        // 0. Diagnostics.
        self.diagnostics.new_iteration(self.step, state.time.cur_time);

        if cfg.solver.solver == FieldSolver::Electrostatic && !self.space_charge_ready {
            field_advance::space_charge(state, cfg, dd)?;
            self.space_charge_ready = true;
        }

        // 1. Load balance.
        let lb = &cfg.load_balance;
        if lb.cost_mode == CostMode::Heuristic {
            state.costs.record_heuristic(&state.species);
        }
        if lb.interval > 0 && self.step > 0 && (self.step + 1) % lb.interval == 0 {
            if self.decomposition.repartition(&state.costs) {
                debug!(step = self.step, "layout changed, full redistribution");
                let geoms = state.geometries();
                for c in state.species.iter_mut() {
                    c.redistribute_full(&geoms)?;
                }
            }
            state.costs.reset();
        }
        let dd = self.decomposition.as_ref();
        if lb.cost_mode == CostMode::Timers {
            state.costs.decay(lb.resolved_decay());
        }

        // 2. Guard cells and the half-step momentum offset.
        let averaged = cfg.psatd.do_multi_j && cfg.psatd.time_averaging;
        if state.time.is_synchronized {
            fill_all(&mut state.levels, em_set(), cfg.grid.ng, dd)?;
            update_aux(&mut state.levels)?;
            if averaged {
                seed_averages(state)?;
                fill_averages(&mut state.levels, cfg.grid.ng, dd);
            }
            for lev in 0..state.levels.len() {
                let dt = state.time.dt[lev];
                pic_step::push_momentum(state, cfg, lev, -0.5 * dt)?;
            }
            state.time.is_synchronized = false;
            debug!(step = self.step, "momenta moved back half a step");
        } else {
            fill_all(&mut state.levels, em_set(), cfg.gather_width(), dd)?;
            update_aux(&mut state.levels)?;
            if averaged {
                fill_averages(&mut state.levels, cfg.gather_width(), dd);
            }
        }

        // 3. Physics hooks.
        self.physics.ionize(&mut state.species, &state.time);
        self.physics.collide(&mut state.species, &state.time);
        self.physics.qed_events(&mut state.species, &state.time);

        // 4. Push, deposit and field advance.
        check_compatibility(cfg, finest)?;
        if cfg.solver.solver != FieldSolver::Fdtd {
            cfg.solver.medium.require_vacuum(cfg.solver.solver.name())?;
        }
        let path = step_path(cfg, finest);
        debug!(step = self.step, ?path, "dispatch");
        match path {
            StepPath::Electrostatic => {
                let start = Instant::now();
                for lev in 0..state.levels.len() {
                    let dt = state.time.dt[lev];
                    pic_step::push_particles(state, cfg, lev, dt)?;
                }
                metrics.push_deposit_us += micros(start);
            }
            StepPath::MultiJ => multi_j::one_step_multi_j(state, cfg, dd, &mut metrics)?,
            StepPath::NoSubcycling => pic_step::one_step_nosub(state, cfg, dd, &mut metrics)?,
            StepPath::Subcycling => subcycling::one_step_sub1(state, cfg, dd, &mut metrics)?,
        }

        // 5. Resampling and mirrors.
        self.physics.resample(&mut state.species, &state.time);
        mirrors::apply(&cfg.mirrors, &mut state.levels, state.time.cur_time + dt0);

        // 6. Resynchronize momenta when the run ends after this step.
        let stop_time = cfg.time.stop_time;
        let last = self.step + 1 == max_steps || state.time.cur_time + dt0 >= stop_time - 1e-3 * dt0;
        if last {
            fill_all(&mut state.levels, em_set(), cfg.grid.ng, dd)?;
            update_aux(&mut state.levels)?;
            if averaged {
                fill_averages(&mut state.levels, cfg.grid.ng, dd);
            }
            for lev in 0..state.levels.len() {
                let dt = state.time.dt[lev];
                pic_step::push_momentum(state, cfg, lev, 0.5 * dt)?;
            }
            state.time.is_synchronized = true;
            debug!(step = self.step, "momenta moved forward half a step");
        }

        // 7. Clock, frame, window, redistribution and boundaries.
        state.time.istep[0] = state.time.istep[0].next();
        if path != StepPath::Subcycling {
            for lev in 1..state.levels.len() {
                state.time.istep[lev] = state.time.istep[lev].next();
            }
        }
        state.time.cur_time += dt0;
        self.step += 1;

        let galilean = cfg.psatd.is_galilean();
        if galilean {
            shift_galilean(&mut state.levels, cfg.psatd.galilean_velocity, dt0);
        }
        let num_moved = self
            .window
            .advance(&cfg.moving_window, &mut state.levels, state.time.cur_time, dt0);

        let start = Instant::now();
        let mut stats = RedistributeStats::default();
        if path == StepPath::Electrostatic || finest > 0 {
            let geoms = state.geometries();
            for c in state.species.iter_mut() {
                stats = stats.merge(c.redistribute_full(&geoms)?);
            }
        } else {
            let ghost = num_moved + if galilean { 2 } else { 1 };
            let geom = state.levels[0].geom().clone();
            for c in state.species.iter_mut() {
                stats = stats.merge(c.redistribute_local(0, &geom, ghost)?);
            }
        }
        let domain = state.levels[0].geom().clone();
        let mut absorbed = 0;
        for c in state.species.iter_mut() {
            for lev in 0..c.num_levels() {
                absorbed += self.boundaries.apply(c, lev, &domain)?;
            }
        }
        metrics.redistribute_us = micros(start);
        if absorbed > 0 {
            debug!(step = self.step, absorbed, "particles left the domain");
        }
        if stats.lost > 0 {
            warn!(step = self.step, lost = stats.lost, "particles lost during redistribution");
        }

        if path == StepPath::Electrostatic {
            let start = Instant::now();
            field_advance::space_charge(state, cfg, dd)?;
            metrics.field_solve_us += micros(start);
        }
        state.time.sync_t_new();
        self.diagnostics.compute_and_flush(state);

        metrics.particles_moved = stats.moved;
        metrics.particles_lost = stats.lost + absorbed;
        metrics.particles = state.num_particles();
        metrics.total_us = micros(step_start);
        info!(
            step = self.step,
            time = state.time.cur_time,
            dt = dt0,
            particles = metrics.particles,
            total_us = metrics.total_us,
            "step complete"
        );
        self.last_metrics = metrics;
        Ok(())
    }
}

/// Start the level-0 averages from the instantaneous fields so the first
/// gather after synchronization reads E and B rather than zeros.
fn seed_averages(state: &mut SimulationState) -> Result<(), InvariantViolation> {
    let Some(base) = state.levels.first_mut() else {
        return Ok(());
    };
    let f = &mut base.fp.fields;
    if let Some(avg) = f.e_avg.as_mut() {
        for (a, e) in avg.iter_mut().zip(&f.e) {
            a.copy_from(e)?;
        }
    }
    if let Some(avg) = f.b_avg.as_mut() {
        for (a, b) in avg.iter_mut().zip(&f.b) {
            a.copy_from(b)?;
        }
    }
    Ok(())
}
