//! Test doubles and fixtures for Corona development.
//!
//! Recording implementations of the engine collaborator traits
//! ([`Diagnostics`], [`PhysicsModules`], [`DomainDecomposition`]) that log
//! every call into a shared buffer, so a test can hand one copy to the
//! [`Simulation`](corona_engine::Simulation) and inspect another.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::{Arc, Mutex};

use corona_engine::{Costs, Diagnostics, DomainDecomposition, LocalDecomposition, PhysicsModules};
use corona_engine::{SimulationState, SimulationTimeState};
use corona_grid::FieldArray;
use corona_particles::ParticleContainer;

// ── RecordingDiagnostics ─────────────────────────────────────────────

/// One call seen by [`RecordingDiagnostics`].
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticEvent {
    NewIteration {
        step: u64,
        time: f64,
    },
    Flush {
        time: f64,
        synchronized: bool,
        particles: usize,
    },
    FlushLast {
        time: f64,
        synchronized: bool,
    },
}

/// Diagnostics sink that records every hook call.
///
/// Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded `compute_and_flush` calls only.
    pub fn flushes(&self) -> Vec<DiagnosticEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, DiagnosticEvent::Flush { .. }))
            .collect()
    }

    fn record(&self, e: DiagnosticEvent) {
        self.events.lock().unwrap().push(e);
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn new_iteration(&mut self, step: u64, time: f64) {
        self.record(DiagnosticEvent::NewIteration { step, time });
    }

    fn compute_and_flush(&mut self, state: &SimulationState) {
        self.record(DiagnosticEvent::Flush {
            time: state.time.cur_time,
            synchronized: state.time.is_synchronized,
            particles: state.num_particles(),
        });
    }

    fn flush_last(&mut self, state: &SimulationState) {
        self.record(DiagnosticEvent::FlushLast {
            time: state.time.cur_time,
            synchronized: state.time.is_synchronized,
        });
    }
}

// ── RecordingPhysics ─────────────────────────────────────────────────

/// Physics hooks that log their names and the clock they were called at.
#[derive(Clone, Debug, Default)]
pub struct RecordingPhysics {
    calls: Arc<Mutex<Vec<(&'static str, f64)>>>,
}

impl RecordingPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(&'static str, f64)> {
        self.calls.lock().unwrap().clone()
    }

    /// Hook names in call order.
    pub fn names(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|(n, _)| n).collect()
    }

    fn record(&self, name: &'static str, time: &SimulationTimeState) {
        self.calls.lock().unwrap().push((name, time.cur_time));
    }
}

impl PhysicsModules for RecordingPhysics {
    fn ionize(&mut self, _species: &mut [ParticleContainer], time: &SimulationTimeState) {
        self.record("ionize", time);
    }

    fn collide(&mut self, _species: &mut [ParticleContainer], time: &SimulationTimeState) {
        self.record("collide", time);
    }

    fn qed_events(&mut self, _species: &mut [ParticleContainer], time: &SimulationTimeState) {
        self.record("qed_events", time);
    }

    fn resample(&mut self, _species: &mut [ParticleContainer], time: &SimulationTimeState) {
        self.record("resample", time);
    }
}

// ── RepartitioningDecomposition ──────────────────────────────────────

/// Single-process decomposition that reports a layout change on every
/// repartition and remembers the cost total it was handed.
#[derive(Clone, Debug, Default)]
pub struct RepartitioningDecomposition {
    seen_costs: Arc<Mutex<Vec<f64>>>,
}

impl RepartitioningDecomposition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost totals passed to each `repartition` call.
    pub fn seen_costs(&self) -> Vec<f64> {
        self.seen_costs.lock().unwrap().clone()
    }
}

impl DomainDecomposition for RepartitioningDecomposition {
    fn fill_boundary(&self, a: &mut FieldArray, w: usize, periodic: [bool; 3]) {
        LocalDecomposition.fill_boundary(a, w, periodic);
    }

    fn sum_boundary(&self, a: &mut FieldArray, periodic: [bool; 3]) {
        LocalDecomposition.sum_boundary(a, periodic);
    }

    fn reduce_sum(&self, local: f64) -> f64 {
        local
    }

    fn reduce_max(&self, local: f64) -> f64 {
        local
    }

    fn repartition(&mut self, costs: &Costs) -> bool {
        self.seen_costs.lock().unwrap().push(costs.total());
        true
    }
}
