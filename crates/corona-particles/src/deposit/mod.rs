//! Particle-to-grid deposition of current and charge density.
//!
//! Every algorithm is a [`DepositKernel`]: a per-particle routine writing
//! `(component, index, value)` contributions into a [`GridSink`]. The
//! [`accumulate`] driver runs a kernel over tiles in parallel with the
//! selected [`Accumulation`] backend. Both backends compute the same
//! commutative sum.
//!
//! Positions and velocities are read from the tile as they stand: after
//! the position push the particles sit at `t + dt`, which is where the
//! `-0.5*dt` relative time of the charge-conserving schemes is measured
//! from.

pub mod accumulate;
pub mod charge;
pub mod direct;
pub mod esirkepov;
pub mod vay;

use corona_core::{ConfigIncompatibility, InvariantViolation, StepError};
use corona_grid::{FieldArray, Geometry};

use crate::container::ParticleContainer;
use crate::shape::ShapeOrder;
use crate::tile::ParticleTile;

pub use accumulate::{accumulate, ScratchTile};

/// Current deposition scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CurrentAlgorithm {
    /// `q w v S(x_mid)` with per-component staggering. Not charge conserving.
    Direct,
    /// Esirkepov (2001), exactly charge conserving on the Yee grid.
    #[default]
    Esirkepov,
    /// Vay et al. (2013): nodal D components turned into J in k-space.
    Vay,
}

impl CurrentAlgorithm {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::Esirkepov => "Esirkepov",
            Self::Vay => "Vay",
        }
    }

    /// Whether the scheme only works at the half step with no drift.
    pub fn is_charge_conserving(self) -> bool {
        matches!(self, Self::Esirkepov | Self::Vay)
    }
}

/// Accumulation backend for concurrent deposition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Accumulation {
    /// One private scratch tile per particle tile, merged atomically.
    #[default]
    ThreadLocal,
    /// Every contribution goes straight to the shared grid atomically.
    Atomic,
}

/// Charge density slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChargeSlot {
    /// Density at the start of the interval.
    Old,
    /// Density at the end of the interval.
    New,
}

impl ChargeSlot {
    /// Index into the `[old, new]` pair.
    pub fn index(self) -> usize {
        match self {
            Self::Old => 0,
            Self::New => 1,
        }
    }
}

/// Destination of deposited contributions.
pub trait GridSink {
    /// Add `value` to `component` at grid index `idx`.
    fn add(&mut self, component: usize, idx: [i64; 3], value: f64);
}

/// A per-particle deposition routine.
pub trait DepositKernel: Sync {
    /// Number of output components.
    const COMPONENTS: usize;

    /// Deposit particle `i` of `tile`.
    fn deposit<S: GridSink>(
        &self,
        tile: &ParticleTile,
        i: usize,
        sink: &mut S,
    ) -> Result<(), InvariantViolation>;
}

/// Parameters of one current deposition.
#[derive(Clone, Copy, Debug)]
pub struct CurrentDeposition<'a> {
    /// Patch receiving the current.
    pub geom: &'a Geometry,
    /// Deposition scheme.
    pub algorithm: CurrentAlgorithm,
    /// Shape order.
    pub order: ShapeOrder,
    /// Length of the deposition interval, s.
    pub dt: f64,
    /// Time of the deposit relative to the window end, s. Charge-conserving
    /// schemes require exactly `-0.5*dt`.
    pub relative_time: f64,
    /// Time from the particles' stored positions to the end of the
    /// deposition window, s. Zero for a standard step; multi-J sub-steps
    /// move the window.
    pub window_shift: f64,
    /// Galilean frame velocity, m/s.
    pub galilean_velocity: [f64; 3],
    /// Accumulation backend.
    pub accumulation: Accumulation,
    /// Mesh level, reported in guard violations.
    pub level: usize,
}

impl<'a> CurrentDeposition<'a> {
    /// Standard half-step deposition of `algorithm` over an interval `dt`.
    pub fn new(geom: &'a Geometry, algorithm: CurrentAlgorithm, order: ShapeOrder, dt: f64) -> Self {
        Self {
            geom,
            algorithm,
            order,
            dt,
            relative_time: -0.5 * dt,
            window_shift: 0.0,
            galilean_velocity: [0.0; 3],
            accumulation: Accumulation::default(),
            level: 0,
        }
    }

    /// Reject a charge-conserving scheme away from the half step or with a
    /// Galilean drift.
    pub fn validate(&self) -> Result<(), ConfigIncompatibility> {
        if !self.algorithm.is_charge_conserving() {
            return Ok(());
        }
        if self.galilean_velocity.iter().any(|v| *v != 0.0) {
            return Err(ConfigIncompatibility::ChargeConservingWithGalilean {
                algorithm: self.algorithm.name(),
            });
        }
        if (self.relative_time + 0.5 * self.dt).abs() > 1e-12 * self.dt.abs() {
            return Err(ConfigIncompatibility::ChargeConservingRelativeTime {
                algorithm: self.algorithm.name(),
                relative_time: self.relative_time,
                dt: self.dt,
            });
        }
        Ok(())
    }

    /// Deposit the tiles of one level, each paired with its cell box, into
    /// `j`. Species charge `charge` in C.
    pub fn deposit(
        &self,
        tiles: Vec<(&ParticleTile, corona_grid::IndexBox)>,
        charge: f64,
        j: [&mut FieldArray; 3],
    ) -> Result<(), StepError> {
        self.validate()?;
        let ng = j[0].layout().max_ng();
        match self.algorithm {
            CurrentAlgorithm::Direct => {
                let kernel = direct::DirectKernel::new(self, charge, ng, j.each_ref().map(|a| a.staggering()));
                accumulate(tiles, j, self.accumulation, &kernel)?;
            }
            CurrentAlgorithm::Esirkepov => {
                let kernel = esirkepov::EsirkepovKernel::new(self, charge, ng);
                accumulate(tiles, j, self.accumulation, &kernel)?;
            }
            CurrentAlgorithm::Vay => {
                let kernel = vay::VayKernel::new(self, charge, ng);
                accumulate(tiles, j, self.accumulation, &kernel)?;
            }
        }
        Ok(())
    }
}

/// Parameters of one charge deposition.
#[derive(Clone, Copy, Debug)]
pub struct ChargeDeposition<'a> {
    /// Patch receiving the density.
    pub geom: &'a Geometry,
    /// Shape order.
    pub order: ShapeOrder,
    /// Time offset from the stored positions, s.
    pub time: f64,
    /// Accumulation backend.
    pub accumulation: Accumulation,
    /// Mesh level, reported in guard violations.
    pub level: usize,
}

impl<'a> ChargeDeposition<'a> {
    /// Deposition at the stored positions.
    pub fn new(geom: &'a Geometry, order: ShapeOrder) -> Self {
        Self {
            geom,
            order,
            time: 0.0,
            accumulation: Accumulation::default(),
            level: 0,
        }
    }

    /// Deposit the tiles of one level into `rho[slot]`.
    pub fn deposit(
        &self,
        tiles: Vec<(&ParticleTile, corona_grid::IndexBox)>,
        charge: f64,
        rho: &mut [FieldArray; 2],
        slot: ChargeSlot,
    ) -> Result<(), StepError> {
        let target = &mut rho[slot.index()];
        let kernel = charge::ChargeKernel::new(self, charge, target.layout().max_ng());
        accumulate(tiles, [target], self.accumulation, &kernel)?;
        Ok(())
    }
}

/// Deposit the current of a single tile into `j`.
pub fn deposit_current(
    tile: &ParticleTile,
    charge: f64,
    j: [&mut FieldArray; 3],
    params: &CurrentDeposition<'_>,
) -> Result<(), StepError> {
    let tiles = vec![(tile, params.geom.valid_box())];
    params.deposit(tiles, charge, j)
}

/// Deposit the charge density of a single tile into `rho[slot]`.
pub fn deposit_charge(
    tile: &ParticleTile,
    charge: f64,
    rho: &mut [FieldArray; 2],
    params: &ChargeDeposition<'_>,
    slot: ChargeSlot,
) -> Result<(), StepError> {
    let tiles = vec![(tile, params.geom.valid_box())];
    params.deposit(tiles, charge, rho, slot)
}

impl ParticleContainer {
    /// Deposit the current of level `lev` into `j`.
    pub fn deposit_current(
        &self,
        lev: usize,
        j: [&mut FieldArray; 3],
        params: &CurrentDeposition<'_>,
    ) -> Result<(), StepError> {
        let tiles = self.tiles_with_boxes(lev, params.geom)?;
        params.deposit(tiles, self.species().charge(), j)
    }

    /// Deposit the charge density of level `lev` into `rho[slot]`.
    pub fn deposit_charge(
        &self,
        lev: usize,
        rho: &mut [FieldArray; 2],
        params: &ChargeDeposition<'_>,
        slot: ChargeSlot,
    ) -> Result<(), StepError> {
        let tiles = self.tiles_with_boxes(lev, params.geom)?;
        params.deposit(tiles, self.species().charge(), rho, slot)
    }
}
