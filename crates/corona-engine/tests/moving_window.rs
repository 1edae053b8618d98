//! Integration test: a moving window drags the domain past particles at
//! rest until the absorbing lower boundary removes them.

use corona_engine::{SimConfig, Simulation};
use corona_grid::BoundaryKind;
use corona_particles::Species;
use corona_solver::FieldSolver;
use corona_test_utils::fixtures::particle;

/// 8 x 16 cells of unit size, window along z at one cell per two steps.
fn config() -> SimConfig {
    let mut cfg = SimConfig::default();
    cfg.grid.n_cells = [8, 1, 16];
    cfg.grid.dx = [1.0; 3];
    cfg.grid.periodic = [true, true, false];
    cfg.time.dt = 0.5;
    cfg.solver.solver = FieldSolver::None;
    cfg.moving_window.enabled = true;
    cfg.moving_window.axis = 2;
    cfg.moving_window.speed = 1.0;
    cfg.particle_boundaries.lo[2] = BoundaryKind::Absorbing;
    cfg.particle_boundaries.hi[2] = BoundaryKind::Absorbing;
    cfg
}

#[test]
fn domain_moves_by_whole_cells() {
    let mut sim = Simulation::new(config(), vec![]).unwrap();
    sim.evolve(1).unwrap();
    assert_eq!(sim.state().levels[0].geom().prob_lo()[2], 0.0);
    sim.evolve(2).unwrap();
    assert_eq!(sim.state().levels[0].geom().prob_lo()[2], 1.0);
    sim.evolve(7).unwrap();
    assert_eq!(sim.state().levels[0].geom().prob_lo()[2], 3.0);
    assert_eq!(sim.state().levels[0].geom().prob_hi()[2], 19.0);
}

#[test]
fn particles_left_behind_are_absorbed() {
    let mut sim = Simulation::new(config(), vec![Species::proton()]).unwrap();
    sim.add_particle(0, particle([4.5, 0.0, 2.5], [0.0; 3], 1.0)).unwrap();
    sim.add_particle(0, particle([4.5, 0.0, 9.5], [0.0; 3], 1.0)).unwrap();

    // Lower edge at 2.0: both still inside.
    sim.evolve(4).unwrap();
    assert_eq!(sim.state().num_particles(), 2);

    // Lower edge at 3.0: the first one is behind the window.
    let mut lost = 0;
    for step in 5..=6 {
        sim.evolve(step).unwrap();
        lost += sim.last_metrics().particles_lost;
    }
    assert_eq!(lost, 1);
    assert_eq!(sim.state().num_particles(), 1);
    let (_, tile, i) = sim.state().species[0].particles().next().unwrap();
    assert_eq!(tile.position(i)[2], 9.5);
}

#[test]
fn fields_shift_with_the_window() {
    let mut sim = Simulation::new(config(), vec![]).unwrap();
    sim.state_mut().levels[0].fp.fields.e[0].set([3, 0, 7], 5.0);
    sim.evolve(2).unwrap();
    let ex = &sim.state().levels[0].fp.fields.e[0];
    assert_eq!(ex.get([3, 0, 6]), 5.0);
    assert_eq!(ex.get([3, 0, 7]), 0.0);
}
