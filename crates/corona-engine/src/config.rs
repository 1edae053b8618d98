//! Simulation configuration, validation, and error types.
//!
//! [`SimConfig`] is the immutable input to [`Simulation::new`]. Every
//! sub-config has a [`Default`] describing a small periodic 2D vacuum run;
//! [`validate()`](SimConfig::validate) checks structural invariants before
//! any array is allocated. Algorithm pairings that only fail at dispatch
//! time surface later as [`ConfigIncompatibility`] from the step loop.
//!
//! [`Simulation::new`]: crate::Simulation::new
//! [`ConfigIncompatibility`]: corona_core::ConfigIncompatibility

use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

use corona_grid::{BoundaryKind, Dim, Geometry, GridError, IndexBox};
use corona_particles::{Accumulation, CurrentAlgorithm, PusherKind, ShapeOrder};
use corona_solver::{FieldSolver, Medium, SolverError};

use crate::costs::CostMode;

// ── GridConfig ─────────────────────────────────────────────────────

/// Level-0 mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Dimensionality. Default: 2D XZ.
    pub dim: Dim,
    /// Cells per axis. Inactive axes are forced to 1. Default: 32 x 1 x 32.
    pub n_cells: [usize; 3],
    /// Cell size per axis, m. Default: 1 µm.
    pub dx: [f64; 3],
    /// Lower corner, m. Default: origin.
    pub prob_lo: [f64; 3],
    /// Periodic axes. Default: all periodic.
    pub periodic: [bool; 3],
    /// Guard cells of every field array. Default: 4.
    pub ng: usize,
    /// Particle tile size in cells. Default: 8 x 8 x 8.
    pub tile_size: [usize; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dim: Dim::Two,
            n_cells: [32, 1, 32],
            dx: [1.0e-6; 3],
            prob_lo: [0.0; 3],
            periodic: [true; 3],
            ng: 4,
            tile_size: [8, 8, 8],
        }
    }
}

impl GridConfig {
    /// Build the level-0 geometry.
    pub fn geometry(&self) -> Result<Geometry, GridError> {
        Geometry::new(self.dim, self.n_cells, self.dx, self.prob_lo, self.periodic)
    }
}

// ── TimeConfig ─────────────────────────────────────────────────────

/// Step size and stop conditions.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeConfig {
    /// Level-0 step, s. Default: 1 fs.
    pub dt: f64,
    /// Step budget. Default: 100.
    pub max_steps: u64,
    /// Physical stop time, s. Default: unbounded.
    pub stop_time: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: 1.0e-15,
            max_steps: 100,
            stop_time: f64::INFINITY,
        }
    }
}

// ── SolverConfig ───────────────────────────────────────────────────

/// Maxwell solver selection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolverConfig {
    /// Field-advance algorithm. Default: FDTD.
    pub solver: FieldSolver,
    /// Material filling the domain. Default: vacuum.
    pub medium: Medium,
    /// Evolve the electric cleaning scalar F. Default: off.
    pub div_e_cleaning: bool,
    /// Evolve the magnetic cleaning scalar G. Default: off.
    pub div_b_cleaning: bool,
}

// ── PsatdConfig ────────────────────────────────────────────────────

/// Spectral-solver options, including the multi-J loop.
#[derive(Clone, Debug, PartialEq)]
pub struct PsatdConfig {
    /// Run the multi-J deposition loop. Default: off.
    pub do_multi_j: bool,
    /// Depositions per step in the multi-J loop. Default: 1.
    pub n_depose: usize,
    /// Treat J as linear in time across each push. Default: off.
    pub j_linear: bool,
    /// Use the deposited rho in the E update. Default: on.
    pub update_with_rho: bool,
    /// Project J onto the deposited rho before the push. Default: off.
    pub current_correction: bool,
    /// Accumulate time-averaged E and B for the gather. Default: off.
    pub time_averaging: bool,
    /// Galilean frame velocity, m/s. Default: zero.
    pub galilean_velocity: [f64; 3],
}

impl Default for PsatdConfig {
    fn default() -> Self {
        Self {
            do_multi_j: false,
            n_depose: 1,
            j_linear: false,
            update_with_rho: true,
            current_correction: false,
            time_averaging: false,
            galilean_velocity: [0.0; 3],
        }
    }
}

impl PsatdConfig {
    /// Options of the per-patch spectral update.
    pub fn solver_options(
        &self,
        solver: &SolverConfig,
        deposition: &DepositionConfig,
    ) -> corona_solver::PsatdConfig {
        corona_solver::PsatdConfig {
            update_with_rho: self.update_with_rho,
            j_linear: self.j_linear,
            div_e_cleaning: solver.div_e_cleaning,
            div_b_cleaning: solver.div_b_cleaning,
            current_correction: self.current_correction,
            vay_deposition: deposition.algorithm == CurrentAlgorithm::Vay,
            time_averaging: self.do_multi_j && self.time_averaging,
        }
    }

    /// Step of the spectral push: `dt / n_depose` under multi-J.
    pub fn solver_dt(&self, dt: f64) -> f64 {
        if self.do_multi_j {
            dt / self.n_depose as f64
        } else {
            dt
        }
    }

    /// Whether the frame drifts.
    pub fn is_galilean(&self) -> bool {
        self.galilean_velocity.iter().any(|v| *v != 0.0)
    }
}

// ── DepositionConfig ───────────────────────────────────────────────

/// Particle shape, deposition and push settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepositionConfig {
    /// Current deposition scheme. Default: Esirkepov.
    pub algorithm: CurrentAlgorithm,
    /// Shape order shared by deposition and gather. Default: cubic.
    pub order: ShapeOrder,
    /// Accumulation backend. Default: thread-local scratch tiles.
    pub accumulation: Accumulation,
    /// Momentum pusher. Default: Boris.
    pub pusher: PusherKind,
}

// ── RefinementConfig ───────────────────────────────────────────────

/// Optional level-1 patch.
#[derive(Clone, Debug, PartialEq)]
pub struct RefinementConfig {
    /// Refined region in level-0 cells. `None` runs a single level.
    pub patch: Option<IndexBox>,
    /// Refinement ratio on every active axis. Default: 2.
    pub ratio: usize,
    /// Advance the fine level with two half steps per coarse step.
    /// Default: off.
    pub subcycling: bool,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            patch: None,
            ratio: 2,
            subcycling: false,
        }
    }
}

impl RefinementConfig {
    /// Number of levels this configuration builds.
    pub fn num_levels(&self) -> usize {
        if self.patch.is_some() {
            2
        } else {
            1
        }
    }

    /// Per-axis ratio, 1 on inactive axes.
    pub fn ratio_vector(&self, dim: Dim) -> [usize; 3] {
        dim.active().map(|a| if a { self.ratio } else { 1 })
    }
}

// ── LoadBalanceConfig ──────────────────────────────────────────────

/// Repartition trigger and cost bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadBalanceConfig {
    /// Steps between repartition checks. 0 disables. Default: 0.
    pub interval: u64,
    /// How tile costs are measured. Default: heuristic.
    pub cost_mode: CostMode,
    /// Per-step decay of timer costs. `None` uses `1 - 2/interval`.
    pub cost_decay: Option<f64>,
}

impl Default for LoadBalanceConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            cost_mode: CostMode::Heuristic,
            cost_decay: None,
        }
    }
}

impl LoadBalanceConfig {
    /// Decay factor applied to timer costs after each step.
    pub fn resolved_decay(&self) -> f64 {
        match self.cost_decay {
            Some(d) => d,
            None if self.interval >= 2 => 1.0 - 2.0 / self.interval as f64,
            None => 0.0,
        }
    }
}

// ── MovingWindowConfig ─────────────────────────────────────────────

/// Window that follows a beam along one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct MovingWindowConfig {
    /// Move the window. Default: off.
    pub enabled: bool,
    /// Axis of motion. Default: z.
    pub axis: usize,
    /// Window speed, m/s. Default: c.
    pub speed: f64,
    /// Time at which the window starts moving, s. Default: 0.
    pub start_time: f64,
}

impl Default for MovingWindowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            axis: 2,
            speed: corona_core::constants::C,
            start_time: 0.0,
        }
    }
}

// ── MirrorConfig ───────────────────────────────────────────────────

/// A slab in which E and B are zeroed after every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mirror {
    /// Lower edge along z in the lab frame, m.
    pub z_min: f64,
    /// Upper edge along z in the lab frame, m.
    pub z_max: f64,
    /// Minimum thickness in cells.
    pub npoints: usize,
}

/// Perfectly reflecting slabs.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorConfig {
    /// Mirror slabs. Default: none.
    pub mirrors: SmallVec<[Mirror; 2]>,
    /// Lorentz factor of the boosted frame. Default: 1.
    pub boost_gamma: f64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mirrors: SmallVec::new(),
            boost_gamma: 1.0,
        }
    }
}

// ── ParticleBoundaryConfig ─────────────────────────────────────────

/// Particle behavior at the level-0 domain faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleBoundaryConfig {
    /// Lower faces. Default: periodic.
    pub lo: [BoundaryKind; 3],
    /// Upper faces. Default: periodic.
    pub hi: [BoundaryKind; 3],
}

impl Default for ParticleBoundaryConfig {
    fn default() -> Self {
        Self {
            lo: [BoundaryKind::Periodic; 3],
            hi: [BoundaryKind::Periodic; 3],
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimConfig::validate()`] or while building the
/// level hierarchy.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Level-0 or refined geometry is invalid.
    Grid(GridError),
    /// A field solver could not be built.
    Solver(SolverError),
    /// dt is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// Guard cells cannot hold the particle shape.
    GuardsTooNarrow {
        /// Configured guard width.
        ng: usize,
        /// Minimum width for the shape order.
        required: usize,
    },
    /// A tile size is zero on an active axis.
    EmptyTile {
        /// The configured tile size.
        tile_size: [usize; 3],
    },
    /// Multi-J needs at least one deposition per step.
    InvalidDepositionCount {
        /// The configured count.
        n_depose: usize,
    },
    /// The window axis or speed is unusable.
    InvalidMovingWindow {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// A mirror slab or boost factor is malformed.
    InvalidMirror {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// Cost decay outside `[0, 1]`.
    InvalidCostDecay {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Solver(e) => write!(f, "solver: {e}"),
            Self::InvalidTimeStep { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::GuardsTooNarrow { ng, required } => {
                write!(f, "{ng} guard cells cannot hold the particle shape, need {required}")
            }
            Self::EmptyTile { tile_size } => {
                write!(f, "tile size {tile_size:?} is empty on an active axis")
            }
            Self::InvalidDepositionCount { n_depose } => {
                write!(f, "n_depose must be at least 1, got {n_depose}")
            }
            Self::InvalidMovingWindow { reason } => write!(f, "invalid moving window: {reason}"),
            Self::InvalidMirror { reason } => write!(f, "invalid mirror: {reason}"),
            Self::InvalidCostDecay { value } => {
                write!(f, "cost_decay must be in [0.0, 1.0], got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::Solver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<SolverError> for ConfigError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Complete configuration of one simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimConfig {
    /// Level-0 mesh.
    pub grid: GridConfig,
    /// Step size and stop conditions.
    pub time: TimeConfig,
    /// Maxwell solver.
    pub solver: SolverConfig,
    /// Spectral options.
    pub psatd: PsatdConfig,
    /// Shape, deposition and pusher.
    pub deposition: DepositionConfig,
    /// Mesh refinement.
    pub refinement: RefinementConfig,
    /// Load balancing.
    pub load_balance: LoadBalanceConfig,
    /// Moving window.
    pub moving_window: MovingWindowConfig,
    /// Mirrors.
    pub mirrors: MirrorConfig,
    /// Particle boundaries.
    pub particle_boundaries: ParticleBoundaryConfig,
}

impl SimConfig {
    /// Validate all structural invariants.
    ///
    /// Algorithm pairings (subcycling with PSATD, multi-J with FDTD and
    /// the like) are left to the step dispatcher, which reports them as
    /// [`ConfigIncompatibility`](corona_core::ConfigIncompatibility).
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Level-0 geometry must build.
        let geom = self.grid.geometry()?;
        // 2. dt finite and positive.
        let dt = self.time.dt;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep { value: dt });
        }
        // 3. Guards must hold the deposition support.
        let required = self.deposition.order.support();
        if self.grid.ng < required {
            return Err(ConfigError::GuardsTooNarrow {
                ng: self.grid.ng,
                required,
            });
        }
        // 4. Tiles non-empty on active axes.
        if (0..3).any(|d| geom.active(d) && self.grid.tile_size[d] == 0) {
            return Err(ConfigError::EmptyTile {
                tile_size: self.grid.tile_size,
            });
        }
        // 5. Medium parameters.
        self.solver.medium.validate()?;
        // 6. Multi-J count.
        if self.psatd.n_depose == 0 {
            return Err(ConfigError::InvalidDepositionCount {
                n_depose: self.psatd.n_depose,
            });
        }
        // 7. Refined patch inside the domain with a valid ratio.
        if let Some(patch) = self.refinement.patch {
            let ratio = self.refinement.ratio_vector(self.grid.dim);
            geom.refine(patch, ratio)?;
        }
        // 8. Moving window along a non-periodic axis, moving forward.
        let w = &self.moving_window;
        if w.enabled {
            if w.axis >= 3 || !geom.active(w.axis) {
                return Err(ConfigError::InvalidMovingWindow {
                    reason: format!("axis {} is not an active axis", w.axis),
                });
            }
            if geom.periodic()[w.axis] {
                return Err(ConfigError::InvalidMovingWindow {
                    reason: format!("axis {} is periodic", w.axis),
                });
            }
            if !(w.speed.is_finite() && w.speed >= 0.0) {
                return Err(ConfigError::InvalidMovingWindow {
                    reason: format!("speed must be finite and non-negative, got {}", w.speed),
                });
            }
        }
        // 9. Mirrors.
        let m = &self.mirrors;
        if !(m.boost_gamma.is_finite() && m.boost_gamma >= 1.0) {
            return Err(ConfigError::InvalidMirror {
                reason: format!("boost_gamma must be >= 1, got {}", m.boost_gamma),
            });
        }
        for mirror in &m.mirrors {
            if mirror.z_min > mirror.z_max {
                return Err(ConfigError::InvalidMirror {
                    reason: format!("z_min {} exceeds z_max {}", mirror.z_min, mirror.z_max),
                });
            }
        }
        // 10. Cost decay.
        let decay = self.load_balance.resolved_decay();
        if !(0.0..=1.0).contains(&decay) {
            return Err(ConfigError::InvalidCostDecay { value: decay });
        }
        Ok(())
    }

    /// Guard width read by the gather: the shape support, capped by the
    /// allocated guards.
    pub fn gather_width(&self) -> usize {
        self.deposition.order.support().min(self.grid.ng)
    }
}
