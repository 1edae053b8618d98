//! Discrete charge continuity of the Esirkepov scheme and agreement of the
//! accumulation backends.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use corona_core::FieldKind;
use corona_grid::{Dim, FieldArray, Geometry};
use corona_particles::deposit::{self, Accumulation, ChargeDeposition, ChargeSlot, CurrentAlgorithm, CurrentDeposition};
use corona_particles::{ParticleContainer, ParticleData, ParticleTile, ShapeOrder, Species};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

const NG: usize = 4;
const DT: f64 = 1.0e-8;
const ORDERS: [ShapeOrder; 3] = [ShapeOrder::Linear, ShapeOrder::Quadratic, ShapeOrder::Cubic];

fn geometry(dim: Dim) -> Geometry {
    Geometry::new(dim, [8, 8, 8], [1.0, 0.5, 2.0], [0.0; 3], [true; 3]).unwrap()
}

fn current_arrays(g: &Geometry) -> [FieldArray; 3] {
    [FieldKind::Jx, FieldKind::Jy, FieldKind::Jz].map(|k| FieldArray::new(k, g, NG))
}

fn rho_arrays(g: &Geometry) -> [FieldArray; 2] {
    [
        FieldArray::new(FieldKind::Rho, g, NG),
        FieldArray::new(FieldKind::Rho, g, NG),
    ]
}

fn particle(pos: [f64; 3], u: [f64; 3], w: f64) -> ParticleData {
    ParticleData {
        id: 0,
        cpu: 0,
        pos,
        u,
        w,
        runtime: SmallVec::new(),
    }
}

/// Largest `|(rho_new - rho_old)/dt + div J|` over every stored node,
/// relative to `q w / (vol dt)`.
fn continuity_residual(g: &Geometry, order: ShapeOrder, tile: &ParticleTile, charge: f64) -> f64 {
    let mut j = current_arrays(g);
    let [jx, jy, jz] = &mut j;
    let params = CurrentDeposition::new(g, CurrentAlgorithm::Esirkepov, order, DT);
    deposit::deposit_current(tile, charge, [jx, jy, jz], &params).unwrap();

    let mut rho = rho_arrays(g);
    let mut at_new = ChargeDeposition::new(g, order);
    deposit::deposit_charge(tile, charge, &mut rho, &at_new, ChargeSlot::New).unwrap();
    at_new.time = -DT;
    deposit::deposit_charge(tile, charge, &mut rho, &at_new, ChargeSlot::Old).unwrap();

    let dx = g.dx();
    let scale = (charge * tile.w[0] / (g.cell_volume() * DT)).abs();
    let mut worst: f64 = 0.0;
    for idx in rho[0].layout().allocated_box().grow([-1, 0, -1]).iter() {
        let mut residual = (rho[1].get(idx) - rho[0].get(idx)) / DT;
        for d in 0..3 {
            if !g.active(d) {
                continue;
            }
            let mut below = idx;
            below[d] -= 1;
            let here = j[d].try_get(idx).unwrap_or(0.0);
            let prev = j[d].try_get(below).unwrap_or(0.0);
            residual += (here - prev) / dx[d];
        }
        worst = worst.max(residual.abs() / scale);
    }
    worst
}

proptest! {
    #[test]
    fn esirkepov_conserves_charge_in_2d(
        which in 0usize..3,
        x in 2.0f64..6.0,
        z in 4.0f64..12.0,
        ux in -1.5e8f64..1.5e8,
        uy in -1.5e8f64..1.5e8,
        uz in -1.5e8f64..1.5e8,
    ) {
        let g = geometry(Dim::Two);
        let mut tile = ParticleTile::default();
        tile.push(particle([x, 0.0, z], [ux, uy, uz], 3.0));
        let r = continuity_residual(&g, ORDERS[which], &tile, -1.6e-19);
        prop_assert!(r < 1e-9, "residual {r}");
    }

    #[test]
    fn esirkepov_conserves_charge_in_3d(
        which in 0usize..3,
        x in 2.0f64..6.0,
        y in 1.0f64..3.0,
        z in 4.0f64..12.0,
        ux in -1.5e8f64..1.5e8,
        uy in -0.7e8f64..0.7e8,
        uz in -1.5e8f64..1.5e8,
    ) {
        let g = geometry(Dim::Three);
        let mut tile = ParticleTile::default();
        tile.push(particle([x, y, z], [ux, uy, uz], 2.0));
        let r = continuity_residual(&g, ORDERS[which], &tile, 1.6e-19);
        prop_assert!(r < 1e-9, "residual {r}");
    }
}

#[test]
fn out_of_plane_current_matches_direct_deposit_for_static_shape() {
    // A particle moving only along y keeps its in-plane shape, so the
    // Esirkepov Jy equals q w vy S / vol at the nodes.
    let g = geometry(Dim::Two);
    let mut tile = ParticleTile::default();
    tile.push(particle([3.3, 0.0, 5.1], [0.0, 1.0e7, 0.0], 1.0));
    let mut j = current_arrays(&g);
    let [jx, jy, jz] = &mut j;
    let params = CurrentDeposition::new(&g, CurrentAlgorithm::Esirkepov, ShapeOrder::Linear, DT);
    deposit::deposit_current(&tile, 1.0, [jx, jy, jz], &params).unwrap();
    let vy = tile.velocity(0)[1];
    let total: f64 = j[1].data().iter().sum::<f64>() * g.cell_volume();
    assert_relative_eq!(total, vy, max_relative = 1e-9);
    assert_eq!(j[0].max_abs_valid(), 0.0);
}

#[test]
fn particle_beyond_guard_allowance_is_rejected() {
    let g = geometry(Dim::Two);
    let mut tile = ParticleTile::default();
    // Cubic shape with 4 guards allows 2.5 cells outside.
    tile.push(particle([-3.0, 0.0, 4.0], [0.0; 3], 1.0));
    let mut rho = rho_arrays(&g);
    let params = ChargeDeposition::new(&g, ShapeOrder::Cubic);
    let err = deposit::deposit_charge(&tile, 1.0, &mut rho, &params, ChargeSlot::New).unwrap_err();
    assert!(matches!(
        err,
        corona_core::StepError::Invariant(corona_core::InvariantViolation::ParticleOutsideGuard { .. })
    ));
}

#[test]
fn accumulation_backends_agree() {
    let g = geometry(Dim::Two);
    let mut container = ParticleContainer::with_tile_size(Species::electron(), 1, [2, 1, 2]);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..500 {
        let pos = [rng.random::<f64>() * 8.0, 0.0, rng.random::<f64>() * 16.0];
        let u = [
            (rng.random::<f64>() - 0.5) * 2.0e8,
            (rng.random::<f64>() - 0.5) * 2.0e8,
            (rng.random::<f64>() - 0.5) * 2.0e8,
        ];
        let mut p = particle(pos, u, 1.0 + rng.random::<f64>());
        p.id = -1;
        container.add_particle(0, &g, p).unwrap();
    }

    let run = |accumulation: Accumulation| {
        let mut j = current_arrays(&g);
        let [jx, jy, jz] = &mut j;
        let mut params = CurrentDeposition::new(&g, CurrentAlgorithm::Esirkepov, ShapeOrder::Cubic, DT);
        params.accumulation = accumulation;
        container.deposit_current(0, [jx, jy, jz], &params).unwrap();
        j
    };
    let a = run(Accumulation::ThreadLocal);
    let b = run(Accumulation::Atomic);
    for d in 0..3 {
        let scale = a[d].data().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        for (x, y) in a[d].data().iter().zip(b[d].data()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12 * scale);
        }
    }
}
