//! Ghost-bound behavior of local redistribution under repeated pushes.

use approx::assert_abs_diff_eq;
use corona_core::constants::C;
use corona_grid::Geometry;
use corona_particles::{ParticleContainer, ParticleData, RedistributeStats, Species};
use smallvec::SmallVec;

const DT: f64 = 1.0e-8;

fn geom() -> Geometry {
    Geometry::xz([64, 16], [1.0, 1.0], [0.0, 0.0], [true, true]).unwrap()
}

/// Momentum per unit mass that moves a particle `cells` cells per step.
fn momentum_for(cells: f64) -> f64 {
    let v = cells / DT;
    v / (1.0 - v * v / (C * C)).sqrt()
}

fn container_with_particle(cells_per_step: f64) -> ParticleContainer {
    let g = geom();
    let mut c = ParticleContainer::new(Species::proton(), 1);
    let p = ParticleData {
        id: -1,
        cpu: 0,
        pos: [7.5, 0.0, 4.5],
        u: [momentum_for(cells_per_step), 0.0, 0.0],
        w: 1.0,
        runtime: SmallVec::new(),
    };
    c.add_particle(0, &g, p).unwrap();
    c
}

fn run(cells_per_step: f64, ghost: usize, steps: usize) -> RedistributeStats {
    let g = geom();
    let mut c = container_with_particle(cells_per_step);
    let mut total = RedistributeStats::default();
    for _ in 0..steps {
        c.push_position(0, DT).unwrap();
        total = total.merge(c.redistribute_local(0, &g, ghost).unwrap());
    }
    total
}

#[test]
fn one_cell_per_step_is_safe_with_bound_one() {
    let stats = run(1.0, 1, 100);
    assert_eq!(stats.lost, 0);
    assert!(stats.moved > 0);
}

#[test]
fn two_cells_per_step_are_lost_with_bound_one() {
    let stats = run(2.0, 1, 1);
    assert_eq!(stats.lost, 1);
}

#[test]
fn two_cells_per_step_are_safe_with_bound_two() {
    let stats = run(2.0, 2, 100);
    assert_eq!(stats.lost, 0);
}

#[test]
fn particles_wrap_around_the_periodic_domain() {
    let g = geom();
    let mut c = container_with_particle(1.0);
    for _ in 0..64 {
        c.push_position(0, DT).unwrap();
        c.redistribute_local(0, &g, 1).unwrap();
    }
    let (_, tile, i) = c.particles().next().unwrap();
    assert_abs_diff_eq!(tile.x[i], 7.5, epsilon = 1e-6);
    assert_eq!(c.num_particles(), 1);
}
