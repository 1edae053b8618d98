//! The mesh-refinement hierarchy.
//!
//! Level 0 is a single fine patch (`fp`) covering the domain. Level 1, when
//! present, adds a fine patch over the refined region, a coarse patch
//! (`cp`) covering the same region at level-0 resolution, and an `aux`
//! copy of E and B that the fine particles gather from.

use corona_core::{Component, FieldKind, InvariantViolation};
use corona_grid::{FieldArray, Geometry, IndexBox};
use corona_solver::{
    ElectrostaticSolver, EmFields, FdtdSolver, FieldOptions, FieldSolver, PsatdSolver,
};

use crate::config::{ConfigError, SimConfig};

/// The field solver attached to one patch.
#[derive(Clone, Debug)]
pub enum PatchSolver {
    /// Finite-difference leapfrog.
    Fdtd(FdtdSolver),
    /// Spectral solver with its k-space state.
    Psatd(Box<PsatdSolver>),
    /// Periodic Poisson solve.
    Electrostatic(ElectrostaticSolver),
    /// Fields are not advanced on this patch.
    None,
}

/// Fields of one patch and the solver that advances them.
#[derive(Clone, Debug)]
pub struct Patch {
    /// E, B, J, rho and the optional arrays.
    pub fields: EmFields,
    /// Solver for `fields`.
    pub solver: PatchSolver,
}

impl Patch {
    /// Allocate a patch on `geom`. `dt` is the step of the level owning
    /// the patch. The electrostatic solver only lives on level 0; refined
    /// patches of an electrostatic run receive interpolated fields.
    pub fn new(geom: Geometry, cfg: &SimConfig, dt: f64, base: bool) -> Result<Self, ConfigError> {
        let spectral = cfg.solver.solver.is_spectral();
        let options = FieldOptions {
            ng: cfg.grid.ng,
            div_e_cleaning: cfg.solver.div_e_cleaning,
            div_b_cleaning: cfg.solver.div_b_cleaning,
            time_averaging: spectral && cfg.psatd.do_multi_j && cfg.psatd.time_averaging,
        };
        let fields = EmFields::new(geom, &options);
        let solver = match cfg.solver.solver {
            FieldSolver::Fdtd => PatchSolver::Fdtd(FdtdSolver::new(cfg.solver.medium)),
            FieldSolver::Psatd => {
                let opts = cfg.psatd.solver_options(&cfg.solver, &cfg.deposition);
                let solver = PsatdSolver::new(&fields, opts, cfg.psatd.solver_dt(dt))?;
                PatchSolver::Psatd(Box::new(solver))
            }
            FieldSolver::Electrostatic if base => {
                PatchSolver::Electrostatic(ElectrostaticSolver::new(&fields)?)
            }
            FieldSolver::Electrostatic | FieldSolver::None => PatchSolver::None,
        };
        Ok(Self { fields, solver })
    }

    /// Spectral solver, if this patch has one.
    pub fn psatd_mut(&mut self) -> Option<(&mut PsatdSolver, &mut EmFields)> {
        match &mut self.solver {
            PatchSolver::Psatd(s) => Some((s.as_mut(), &mut self.fields)),
            _ => None,
        }
    }
}

/// E and B as seen by the particles of a refined level.
#[derive(Clone, Debug)]
pub struct AuxFields {
    /// Gather E.
    pub e: [FieldArray; 3],
    /// Gather B.
    pub b: [FieldArray; 3],
}

impl AuxFields {
    fn new(geom: &Geometry, ng: usize) -> Self {
        Self {
            e: Component::ALL.map(|c| FieldArray::new(FieldKind::electric(c), geom, ng)),
            b: Component::ALL.map(|c| FieldArray::new(FieldKind::magnetic(c), geom, ng)),
        }
    }
}

/// What a refined level keeps about its parent.
#[derive(Clone, Debug)]
pub struct CoarseLink {
    /// Coarse patch over the refined region.
    pub cp: Patch,
    /// Gather fields.
    pub aux: AuxFields,
    /// Refined region in parent cells.
    pub region: IndexBox,
    /// Refinement ratio per axis.
    pub ratio: [usize; 3],
}

impl CoarseLink {
    /// Parent index of fine (and coarse-patch) index 0.
    pub fn offset(&self) -> [i64; 3] {
        self.region.lo
    }
}

/// One refinement level.
#[derive(Clone, Debug)]
pub struct Level {
    /// Fine patch.
    pub fp: Patch,
    /// Coarse patch and aux, on levels above 0.
    pub coarse: Option<CoarseLink>,
}

impl Level {
    /// Geometry of the fine patch.
    pub fn geom(&self) -> &Geometry {
        &self.fp.fields.geom
    }

    /// Every patch of this level, fine first.
    pub fn patches_mut(&mut self) -> impl Iterator<Item = &mut Patch> {
        std::iter::once(&mut self.fp).chain(self.coarse.as_mut().map(|c| &mut c.cp))
    }

    /// The coarse link, required on refined levels.
    pub fn link(&self, lev: usize) -> Result<&CoarseLink, InvariantViolation> {
        self.coarse
            .as_ref()
            .ok_or(InvariantViolation::LevelOutOfRange { level: lev, finest: 0 })
    }
}

/// Build level 0 and, if configured, level 1.
pub fn build_levels(cfg: &SimConfig, dt: &[f64]) -> Result<Vec<Level>, ConfigError> {
    let base_geom = cfg.grid.geometry()?;
    let mut levels = Vec::with_capacity(cfg.refinement.num_levels());
    if let Some(region) = cfg.refinement.patch {
        let ratio = cfg.refinement.ratio_vector(cfg.grid.dim);
        let fine_geom = base_geom.refine(region, ratio)?;
        let coarse_geom = base_geom.subpatch(region)?;
        let dt1 = dt.get(1).copied().unwrap_or(cfg.time.dt);
        let fp = Patch::new(fine_geom.clone(), cfg, dt1, false)?;
        let cp = Patch::new(coarse_geom, cfg, dt1, false)?;
        let link = CoarseLink {
            cp,
            aux: AuxFields::new(&fine_geom, cfg.grid.ng),
            region,
            ratio,
        };
        levels.push(Level {
            fp: Patch::new(base_geom, cfg, cfg.time.dt, true)?,
            coarse: None,
        });
        levels.push(Level {
            fp,
            coarse: Some(link),
        });
    } else {
        levels.push(Level {
            fp: Patch::new(base_geom, cfg, cfg.time.dt, true)?,
            coarse: None,
        });
    }
    Ok(levels)
}
