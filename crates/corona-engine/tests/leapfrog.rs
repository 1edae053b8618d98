//! Integration test: the half-step momentum protocol seen from outside.
//!
//! Momenta are moved back half a step on the first step of every
//! `evolve` call and forward again on the step that ends it, so the state
//! handed to diagnostics is desynchronized mid-run and synchronized at the
//! end. A particle in a uniform E field under the "none" solver gains
//! exactly `qE/m` per unit time regardless of how the run is split.

use corona_core::constants::{M_E, Q_E};
use corona_engine::{CostMode, Simulation, SimConfig};
use corona_particles::Species;
use corona_solver::FieldSolver;
use corona_test_utils::fixtures::{particle, vacuum_xz};
use corona_test_utils::{DiagnosticEvent, RecordingDiagnostics, RecordingPhysics, RepartitioningDecomposition};

const E_X: f64 = 1.0e3;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(f64::MIN_POSITIVE)
}

fn config() -> SimConfig {
    let mut cfg = vacuum_xz(16, 16, 1.0e-6);
    cfg.solver.solver = FieldSolver::None;
    cfg
}

fn accelerated_electron() -> Simulation {
    let mut sim = Simulation::new(config(), vec![Species::electron()]).unwrap();
    sim.add_particle(0, particle([8.0e-6, 0.0, 8.0e-6], [0.0; 3], 1.0))
        .unwrap();
    sim.state_mut().levels[0].fp.fields.e[0].fill(E_X);
    sim
}

fn electron_ux(sim: &Simulation) -> f64 {
    let (_, tile, i) = sim.state().species[0].particles().next().unwrap();
    tile.momentum(i)[0]
}

#[test]
fn diagnostics_see_half_step_momenta_until_the_last_step() {
    let diag = RecordingDiagnostics::new();
    let mut sim = Simulation::new(config(), vec![]).unwrap().with_diagnostics(diag.clone());
    let dt = sim.config().time.dt;
    sim.evolve(3).unwrap();

    let events = diag.events();
    assert_eq!(events.len(), 7);
    assert_eq!(events[0], DiagnosticEvent::NewIteration { step: 0, time: 0.0 });
    let synced: Vec<bool> = diag
        .flushes()
        .iter()
        .map(|e| match e {
            DiagnosticEvent::Flush { synchronized, .. } => *synchronized,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(synced, vec![false, false, true]);
    match events[6] {
        DiagnosticEvent::FlushLast { time, synchronized } => {
            assert!(close(time, 3.0 * dt));
            assert!(synchronized);
        }
        ref other => panic!("expected FlushLast, got {other:?}"),
    }
    assert!(sim.state().time.is_synchronized);
}

#[test]
fn a_second_evolve_call_desynchronizes_again() {
    let diag = RecordingDiagnostics::new();
    let mut sim = Simulation::new(config(), vec![]).unwrap().with_diagnostics(diag.clone());
    sim.evolve(2).unwrap();
    sim.evolve(5).unwrap();
    assert_eq!(sim.step(), 5);
    let synced: Vec<bool> = diag
        .flushes()
        .iter()
        .filter_map(|e| match e {
            DiagnosticEvent::Flush { synchronized, .. } => Some(*synchronized),
            _ => None,
        })
        .collect();
    assert_eq!(synced, vec![false, true, false, false, true]);
}

#[test]
fn uniform_field_accelerates_linearly_in_time() {
    let mut sim = accelerated_electron();
    let dt = sim.config().time.dt;
    sim.evolve(10).unwrap();
    let expected = -Q_E / M_E * E_X * 10.0 * dt;
    assert!(close(electron_ux(&sim), expected), "{} vs {expected}", electron_ux(&sim));
}

#[test]
fn splitting_a_run_does_not_change_the_momentum() {
    let mut whole = accelerated_electron();
    whole.evolve(6).unwrap();

    let mut split = accelerated_electron();
    split.evolve(2).unwrap();
    split.evolve(4).unwrap();
    split.evolve(6).unwrap();

    assert!(close(electron_ux(&whole), electron_ux(&split)));
}

#[test]
fn stop_time_ends_the_run_synchronized() {
    let mut cfg = config();
    cfg.time.stop_time = 2.5 * cfg.time.dt;
    let mut sim = Simulation::new(cfg, vec![]).unwrap();
    sim.evolve(100).unwrap();
    assert_eq!(sim.step(), 3);
    assert!(sim.state().time.is_synchronized);

    // Already past the stop time: nothing to do.
    sim.evolve(100).unwrap();
    assert_eq!(sim.step(), 3);
}

#[test]
fn physics_hooks_run_in_order_every_step() {
    let physics = RecordingPhysics::new();
    let mut sim = Simulation::new(config(), vec![]).unwrap().with_physics(physics.clone());
    sim.evolve(2).unwrap();
    let one = ["ionize", "collide", "qed_events", "resample"];
    let expected: Vec<&str> = one.iter().chain(one.iter()).copied().collect();
    assert_eq!(physics.names(), expected);
    let calls = physics.calls();
    assert_eq!(calls[0].1, 0.0);
    assert!(calls[4].1 > 0.0);
}

#[test]
fn repartition_triggers_on_the_interval_and_keeps_particles() {
    let mut cfg = config();
    cfg.load_balance.interval = 2;
    cfg.load_balance.cost_mode = CostMode::Heuristic;
    let dd = RepartitioningDecomposition::new();
    let mut sim = Simulation::new(cfg, vec![Species::electron()])
        .unwrap()
        .with_decomposition(dd.clone());
    for k in 0..3 {
        let x = (2.0 + 4.0 * k as f64) * 1.0e-6;
        sim.add_particle(0, particle([x, 0.0, 5.0e-6], [0.0; 3], 1.0)).unwrap();
    }
    sim.evolve(4).unwrap();
    assert_eq!(dd.seen_costs(), vec![3.0, 3.0]);
    assert_eq!(sim.state().num_particles(), 3);
    assert_eq!(sim.last_metrics().particles, 3);
}
