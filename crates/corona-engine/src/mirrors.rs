//! Perfectly reflecting slabs: E and B are zeroed inside each mirror after
//! every step.

use corona_core::constants::C;
use corona_grid::FieldArray;

use crate::config::MirrorConfig;
use crate::level::Level;

const Z: usize = 2;

/// Slab `[lo, hi]` along z in the simulation frame at time `t`, on a patch
/// with cell size `dz`.
pub fn slab(z_min: f64, z_max: f64, npoints: usize, gamma: f64, t: f64, dz: f64) -> (f64, f64) {
    let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();
    let lo = z_min / gamma - C * beta * t;
    let hi = z_max / gamma - C * beta * t;
    (lo, hi.max(lo + npoints as f64 * dz))
}

fn zero_slab(a: &mut FieldArray, geom: &corona_grid::Geometry, lo: f64, hi: f64) {
    let offset = a.staggering().offset(Z);
    for idx in a.layout().valid_box().iter() {
        let z = geom.coordinate(Z, idx[Z], offset);
        if z >= lo && z <= hi {
            a.set(idx, 0.0);
        }
    }
    a.invalidate_guards();
}

/// Zero E and B inside every mirror on every patch.
pub fn apply(cfg: &MirrorConfig, levels: &mut [Level], t: f64) {
    if cfg.mirrors.is_empty() {
        return;
    }
    for level in levels.iter_mut() {
        for patch in level.patches_mut() {
            let fields = &mut patch.fields;
            if !fields.geom.active(Z) {
                continue;
            }
            let dz = fields.geom.dx()[Z];
            for m in &cfg.mirrors {
                let (lo, hi) = slab(m.z_min, m.z_max, m.npoints, cfg.boost_gamma, t, dz);
                for a in fields.e.iter_mut().chain(fields.b.iter_mut()) {
                    zero_slab(a, &fields.geom, lo, hi);
                }
            }
        }
    }
}
