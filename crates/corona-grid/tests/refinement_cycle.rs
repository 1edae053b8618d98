//! Interpolate-then-restrict cycles between a coarse level and a refined patch.

use corona_core::FieldKind;
use corona_grid::transfer::{fill_guards_from_coarse, interpolate, restrict, Combine};
use corona_grid::{halo, Dim, FieldArray, Geometry, IndexBox};

fn levels() -> (Geometry, Geometry, Geometry) {
    let coarse =
        Geometry::new(Dim::Three, [8, 8, 8], [1.0; 3], [0.0; 3], [true; 3]).unwrap();
    let patch = IndexBox::new([2, 2, 2], [6, 6, 6]);
    let fine = coarse.refine(patch, [2; 3]).unwrap();
    let cp = coarse.subpatch(patch).unwrap();
    (coarse, fine, cp)
}

#[test]
fn uniform_density_survives_a_round_trip() {
    let (coarse_geom, fine_geom, cp_geom) = levels();
    let mut coarse = FieldArray::new(FieldKind::Rho, &coarse_geom, 2);
    coarse.fill(3.0);

    let mut fine = FieldArray::new(FieldKind::Rho, &fine_geom, 2);
    let region = fine.layout().allocated_box();
    interpolate(&coarse, &mut fine, [2; 3], [2; 3], region, Combine::Overwrite, [true; 3]);

    let mut cp = FieldArray::new(FieldKind::Rho, &cp_geom, 2);
    restrict(&fine, &mut cp, [2; 3]);
    for idx in cp.layout().valid_box().iter() {
        assert!((cp.get(idx) - 3.0).abs() < 1e-12, "{idx:?}: {}", cp.get(idx));
    }
}

#[test]
fn fine_guards_follow_the_coarse_level() {
    let (coarse_geom, fine_geom, _) = levels();
    let mut coarse = FieldArray::new(FieldKind::Ey, &coarse_geom, 2);
    for idx in coarse.layout().valid_box().iter() {
        coarse.set(idx, idx[0] as f64);
    }
    coarse.invalidate_guards();
    halo::fill_boundary(&mut coarse, 2, [true; 3]);

    let mut fine = FieldArray::new(FieldKind::Ey, &fine_geom, 2);
    fine.invalidate_guards();
    fill_guards_from_coarse(&mut fine, &coarse, [2; 3], [2; 3], 2, [true; 3]);
    assert_eq!(fine.guard_valid(), 2);
    // Ey is nodal in x: fine node -2 sits on coarse node 1.
    assert!((fine.get([-2, 0, 0]) - 1.0).abs() < 1e-12);
    // Fine node -1 sits halfway between coarse nodes 1 and 2.
    assert!((fine.get([-1, 0, 0]) - 1.5).abs() < 1e-12);
}
