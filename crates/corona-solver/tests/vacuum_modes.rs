//! A single vacuum mode under the spectral and finite-difference solvers.

use corona_core::constants::C;
use corona_grid::{halo, Geometry};
use corona_solver::psatd::mode_coefficients;
use corona_solver::{EmFields, FdtdSolver, FieldOptions, PsatdConfig, PsatdSolver};
use std::f64::consts::PI;

const N: usize = 32;
const DX: f64 = 1.0e-6;
const E0: f64 = 1.0e9;

fn wavenumber(mode: usize) -> f64 {
    2.0 * PI * mode as f64 / (N as f64 * DX)
}

/// `Ey = E0 cos(k x)` on a periodic XZ patch, B zero.
fn seeded(mode: usize) -> EmFields {
    let g = Geometry::xz([N, 4], [DX, DX], [0.0, 0.0], [true, true]).unwrap();
    let mut f = EmFields::new(g, &FieldOptions { ng: 3, ..FieldOptions::default() });
    let k = wavenumber(mode);
    for idx in f.e[1].layout().valid_box().iter() {
        f.e[1].set(idx, E0 * (k * idx[0] as f64 * DX).cos());
    }
    f
}

fn assert_mode(f: &EmFields, k: f64, e_amp: f64, b_amp: f64, tol: f64) {
    for i in 0..N as i64 {
        let x = i as f64 * DX;
        let ey = e_amp * (k * x).cos();
        let bz = b_amp * (k * (x + 0.5 * DX)).sin();
        assert!((f.e[1].get([i, 0, 2]) - ey).abs() <= tol * E0, "Ey[{i}]");
        assert!((f.b[2].get([i, 0, 2]) - bz).abs() <= tol * E0 / C, "Bz[{i}]");
    }
}

#[test]
fn one_spectral_step_applies_c_and_s_ck() {
    let mut f = seeded(3);
    let k = wavenumber(3);
    let dt = 0.7 * DX / C;
    let mut s = PsatdSolver::new(&f, PsatdConfig::default(), dt).unwrap();
    s.advance(&mut f).unwrap();
    let co = mode_coefficients(k, dt);
    assert_mode(&f, k, E0 * co.c, E0 * co.s_ck * k, 1e-12);
}

#[test]
fn spectral_steps_rotate_the_mode_exactly() {
    let mut f = seeded(5);
    let k = wavenumber(5);
    let dt = 2.0 * DX / C;
    let mut s = PsatdSolver::new(&f, PsatdConfig::default(), dt).unwrap();
    let steps = 40;
    for _ in 0..steps {
        s.advance(&mut f).unwrap();
    }
    let phase = C * k * dt * steps as f64;
    assert_mode(&f, k, E0 * phase.cos(), E0 / C * phase.sin(), 1e-10);
}

#[test]
fn finite_difference_tracks_the_resolved_mode() {
    let mut f = seeded(1);
    let k = wavenumber(1);
    let dt = 0.5 * DX / C;
    let s = FdtdSolver::default();
    let fill = |f: &mut EmFields| {
        for a in f.e.iter_mut().chain(f.b.iter_mut()) {
            halo::fill_boundary(a, 1, [true, false, true]);
        }
    };
    fill(&mut f);
    let steps = 20;
    for _ in 0..steps {
        s.evolve_b(&mut f, 0.5 * dt).unwrap();
        fill(&mut f);
        s.evolve_e(&mut f, dt).unwrap();
        fill(&mut f);
        s.evolve_b(&mut f, 0.5 * dt).unwrap();
        fill(&mut f);
    }
    let phase = C * k * dt * steps as f64;
    assert_mode(&f, k, E0 * phase.cos(), E0 / C * phase.sin(), 2e-2);
}
