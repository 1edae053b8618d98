//! Criterion benchmarks for the spectral field advance.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use corona_core::constants::C;
use corona_grid::Geometry;
use corona_solver::{EmFields, FieldOptions, PsatdConfig, PsatdSolver};

fn seeded(n: usize) -> EmFields {
    let dx = 1.0e-6;
    let g = Geometry::xz([n, n], [dx, dx], [0.0, 0.0], [true, true]).unwrap();
    let mut f = EmFields::new(g, &FieldOptions::default());
    for idx in f.e[1].layout().valid_box().iter() {
        f.e[1].set(idx, ((idx[0] + 3 * idx[2]) as f64 * 0.1).sin());
    }
    f
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("psatd_advance");
    for n in [32usize, 64, 128] {
        let mut f = seeded(n);
        let dt = 0.9e-6 / C;
        let configs = [
            ("plain", PsatdConfig::default()),
            (
                "with_correction",
                PsatdConfig {
                    current_correction: true,
                    ..PsatdConfig::default()
                },
            ),
        ];
        for (name, config) in configs {
            let mut s = PsatdSolver::new(&f, config, dt).unwrap();
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| s.advance(&mut f).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
