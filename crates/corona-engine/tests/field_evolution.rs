//! Integration test: field advance through the full step loop.
//!
//! A single vacuum mode under FDTD must oscillate at the discrete Yee
//! frequency, mirrors must keep their slab empty, and a neutral pair at
//! rest must leave the fields untouched under every solver path.

use std::f64::consts::PI;

use corona_core::constants::C;
use corona_engine::{Mirror, SimConfig, Simulation};
use corona_particles::Species;
use corona_solver::FieldSolver;
use corona_test_utils::fixtures::{neutral_pair_at, particle, vacuum_xz};

const NX: usize = 32;
const DX: f64 = 1.0e-6;
const E0: f64 = 1.0e9;

/// `Ey = E0 cos(k x)` on level 0, `k` the lowest periodic mode along x.
fn seed_mode(sim: &mut Simulation) -> f64 {
    let k = 2.0 * PI / (NX as f64 * DX);
    let ey = &mut sim.state_mut().levels[0].fp.fields.e[1];
    for idx in ey.layout().valid_box().iter() {
        ey.set(idx, E0 * (k * idx[0] as f64 * DX).cos());
    }
    k
}

fn fields_are_empty(sim: &Simulation) -> bool {
    let f = &sim.state().levels[0].fp.fields;
    f.e.iter().chain(f.b.iter()).all(|a| a.max_abs_valid() == 0.0)
}

#[test]
fn fdtd_mode_oscillates_at_the_discrete_frequency() {
    let cfg = vacuum_xz(NX, 8, DX);
    let dt = cfg.time.dt;
    let mut sim = Simulation::new(cfg, vec![]).unwrap();
    let k = seed_mode(&mut sim);
    let steps = 25;
    sim.evolve(steps).unwrap();

    let theta = 2.0 * (C * dt / DX * (0.5 * k * DX).sin()).asin();
    let amp = E0 * (theta * steps as f64).cos();
    let ey = &sim.state().levels[0].fp.fields.e[1];
    for i in 0..NX as i64 {
        let expected = amp * (k * i as f64 * DX).cos();
        let got = ey.get([i, 0, 3]);
        assert!((got - expected).abs() <= 1e-9 * E0, "Ey[{i}] = {got}, expected {expected}");
    }
    assert!(ey.max_abs_valid() <= E0 * (1.0 + 1e-12));
}

#[test]
fn mirror_slab_stays_empty() {
    let mut cfg = vacuum_xz(NX, 16, DX);
    cfg.mirrors.mirrors.push(Mirror {
        z_min: 4.0 * DX,
        z_max: 6.0 * DX,
        npoints: 1,
    });
    let mut sim = Simulation::new(cfg, vec![]).unwrap();
    seed_mode(&mut sim);
    sim.evolve(5).unwrap();
    let f = &sim.state().levels[0].fp.fields;
    for i in 0..NX as i64 {
        for kz in 4..=6 {
            assert_eq!(f.e[1].get([i, 0, kz]), 0.0, "Ey[{i}, {kz}]");
        }
    }
    // Outside the slab the mode survives.
    assert!(f.e[1].get([0, 0, 10]).abs() > 0.0);
}

const PAIR_AT: [f64; 3] = [10.3e-6, 0.0, 5.7e-6];

fn run_neutral_pair(cfg: SimConfig, steps: u64) -> Simulation {
    let mut sim = Simulation::new(cfg, vec![Species::electron(), Species::positron()]).unwrap();
    let [e, p] = neutral_pair_at(PAIR_AT, 2.0);
    sim.add_particle(0, e).unwrap();
    sim.add_particle(1, p).unwrap();
    sim.evolve(steps).unwrap();
    sim
}

fn assert_pair_unmoved(sim: &Simulation) {
    assert_eq!(sim.state().num_particles(), 2);
    for c in &sim.state().species {
        let (_, tile, i) = c.particles().next().unwrap();
        assert_eq!(tile.momentum(i), [0.0; 3]);
        assert_eq!(tile.position(i), PAIR_AT);
    }
}

#[test]
fn neutral_pair_at_rest_leaves_fdtd_fields_empty() {
    let sim = run_neutral_pair(vacuum_xz(NX, 16, DX), 8);
    assert!(fields_are_empty(&sim));
    assert_pair_unmoved(&sim);
}

#[test]
fn neutral_pair_at_rest_leaves_spectral_fields_empty() {
    let mut cfg = vacuum_xz(NX, 16, DX);
    cfg.solver.solver = FieldSolver::Psatd;
    let sim = run_neutral_pair(cfg, 4);
    assert!(fields_are_empty(&sim));
    assert_pair_unmoved(&sim);
}

#[test]
fn neutral_pair_at_rest_leaves_multi_j_fields_empty() {
    let mut cfg = vacuum_xz(NX, 16, DX);
    cfg.solver.solver = FieldSolver::Psatd;
    cfg.psatd.do_multi_j = true;
    cfg.psatd.n_depose = 3;
    cfg.psatd.j_linear = true;
    let sim = run_neutral_pair(cfg, 3);
    assert!(fields_are_empty(&sim));
    assert_pair_unmoved(&sim);
    assert_eq!(sim.state().time.istep[0].0, 3);
}

#[test]
fn electrostatic_run_builds_the_space_charge_field() {
    let mut cfg = vacuum_xz(NX, 16, DX);
    cfg.solver.solver = FieldSolver::Electrostatic;
    let mut sim = Simulation::new(cfg, vec![Species::electron()]).unwrap();
    sim.add_particle(0, particle([16.0e-6, 0.0, 8.0e-6], [0.0; 3], 1.0e6))
        .unwrap();
    sim.evolve(2).unwrap();
    let f = &sim.state().levels[0].fp.fields;
    assert!(f.e[0].max_abs_valid() > 0.0);
    assert!(f.e[2].max_abs_valid() > 0.0);
    assert!(f.b.iter().all(|b| b.max_abs_valid() == 0.0));
    assert_eq!(sim.state().num_particles(), 1);
}
