//! Physical constants in SI units (CODATA 2018).

/// Speed of light in vacuum, m/s.
pub const C: f64 = 299_792_458.0;

/// Vacuum permeability, H/m.
pub const MU0: f64 = 1.256_637_062_12e-6;

/// Vacuum permittivity, F/m.
pub const EP0: f64 = 8.854_187_812_8e-12;

/// Elementary charge, C.
pub const Q_E: f64 = 1.602_176_634e-19;

/// Electron mass, kg.
pub const M_E: f64 = 9.109_383_701_5e-31;

/// Proton mass, kg.
pub const M_P: f64 = 1.672_621_923_69e-27;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacuum_constants_are_consistent() {
        let c_from_eps_mu = 1.0 / (EP0 * MU0).sqrt();
        assert!((c_from_eps_mu - C).abs() / C < 1e-9);
    }
}
