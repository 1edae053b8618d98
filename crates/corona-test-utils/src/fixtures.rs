//! Reusable configurations and particle generators.
//!
//! Generators are seeded with [`ChaCha8Rng`] so a failing test replays
//! the same plasma.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use corona_core::constants::C;
use corona_engine::SimConfig;
use corona_grid::{Dim, Geometry};
use corona_particles::ParticleData;

/// Periodic xz vacuum box of `nx` x `nz` cells of size `dx`, stepped at
/// half the 2D Courant limit.
pub fn vacuum_xz(nx: usize, nz: usize, dx: f64) -> SimConfig {
    let mut cfg = SimConfig::default();
    cfg.grid.dim = Dim::Two;
    cfg.grid.n_cells = [nx, 1, nz];
    cfg.grid.dx = [dx; 3];
    cfg.time.dt = 0.5 * dx / (C * 2f64.sqrt());
    cfg
}

/// A particle with a fresh id and no runtime attributes.
pub fn particle(pos: [f64; 3], u: [f64; 3], w: f64) -> ParticleData {
    ParticleData {
        id: -1,
        cpu: 0,
        pos,
        u,
        w,
        runtime: SmallVec::new(),
    }
}

/// Momentum per unit mass of a particle moving at `v` along one axis.
pub fn momentum_for_speed(v: f64) -> f64 {
    v / (1.0 - v * v / (C * C)).sqrt()
}

/// `ppc` particles per cell placed uniformly at random over the valid
/// region of `geom`, with momenta drawn uniformly from `[-u_max, u_max]`
/// on each axis.
pub fn uniform_plasma(geom: &Geometry, ppc: usize, u_max: f64, w: f64, seed: u64) -> Vec<ParticleData> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let lo = geom.prob_lo();
    let dx = geom.dx();
    let n = geom.n_cells();
    let cells: usize = (0..3).filter(|d| geom.active(*d)).map(|d| n[d]).product();
    let mut out = Vec::with_capacity(cells * ppc);
    for cell in geom.valid_box().iter() {
        for _ in 0..ppc {
            let mut pos = [0.0; 3];
            for d in 0..3 {
                if geom.active(d) {
                    pos[d] = lo[d] + (cell[d] as f64 + rng.random::<f64>()) * dx[d];
                }
            }
            let u = [0, 1, 2].map(|_| (rng.random::<f64>() - 0.5) * 2.0 * u_max);
            out.push(particle(pos, u, w));
        }
    }
    out
}

/// Electron-positron pair at the same point and at rest. Its charge
/// density cancels exactly on the grid.
pub fn neutral_pair_at(pos: [f64; 3], w: f64) -> [ParticleData; 2] {
    [particle(pos, [0.0; 3], w), particle(pos, [0.0; 3], w)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plasma_is_reproducible_and_inside() {
        let geom = Geometry::xz([4, 8], [1.0, 1.0], [0.0, 0.0], [true, true]).unwrap();
        let a = uniform_plasma(&geom, 2, 1.0e6, 1.0, 7);
        let b = uniform_plasma(&geom, 2, 1.0e6, 1.0, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        for p in &a {
            assert!(p.pos[0] >= 0.0 && p.pos[0] < 4.0);
            assert!(p.pos[2] >= 0.0 && p.pos[2] < 8.0);
            assert!(p.u.iter().all(|u| u.abs() <= 1.0e6));
        }
    }

    #[test]
    fn vacuum_config_validates() {
        assert_eq!(vacuum_xz(16, 16, 1.0e-6).validate(), Ok(()));
    }
}
