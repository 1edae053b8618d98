//! Analytic PSATD coefficients per Fourier mode.
//!
//! With `theta = c |k| dt`:
//!
//! ```text
//! C    = cos(theta)
//! S_ck = sin(theta) / (c |k|)
//! X1   = (1 - C) / (eps0 c^2 k^2)
//! X2   = (1 - S_ck/dt) / (eps0 k^2)
//! X3   = (C - S_ck/dt) / (eps0 k^2)
//! ```
//!
//! X2 and X3 cancel catastrophically as `theta -> 0`; below
//! [`SERIES_THRESHOLD`] they come from their Taylor series instead.

use corona_core::constants::{C, EP0};

use super::kspace::KSpace;

/// Below this `theta` X2 and X3 use their series expansions.
pub const SERIES_THRESHOLD: f64 = 1.0e-2;

/// The five update coefficients of one mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeCoefficients {
    /// `cos(theta)`.
    pub c: f64,
    /// `sin(theta) / (c k)`.
    pub s_ck: f64,
    /// Current-to-B coefficient.
    pub x1: f64,
    /// New-charge coefficient.
    pub x2: f64,
    /// Old-charge coefficient.
    pub x3: f64,
}

impl ModeCoefficients {
    /// The exact `k -> 0` limit.
    pub fn zero_mode(dt: f64) -> Self {
        let c2dt2 = C * C * dt * dt;
        Self {
            c: 1.0,
            s_ck: dt,
            x1: dt * dt / (2.0 * EP0),
            x2: c2dt2 / (6.0 * EP0),
            x3: -c2dt2 / (3.0 * EP0),
        }
    }
}

/// Coefficients of a mode with wave-vector magnitude `k`.
pub fn mode_coefficients(k: f64, dt: f64) -> ModeCoefficients {
    let theta = C * k * dt;
    if theta < f64::EPSILON {
        return ModeCoefficients::zero_mode(dt);
    }
    let (sin, cos) = theta.sin_cos();
    let half = (0.5 * theta).sin();
    let k2 = k * k;
    let c2dt2_over_eps = C * C * dt * dt / EP0;
    let t2 = theta * theta;
    let (x2, x3) = if theta < SERIES_THRESHOLD {
        (
            c2dt2_over_eps * (1.0 / 6.0 - t2 / 120.0 + t2 * t2 / 5040.0),
            c2dt2_over_eps * (-1.0 / 3.0 + t2 / 30.0 - t2 * t2 / 840.0),
        )
    } else {
        let sinc = sin / theta;
        ((1.0 - sinc) / (EP0 * k2), (cos - sinc) / (EP0 * k2))
    };
    ModeCoefficients {
        c: cos,
        s_ck: sin / (C * k),
        x1: 2.0 * half * half / (EP0 * C * C * k2),
        x2,
        x3,
    }
}

/// Coefficients of every mode of a spectral box, for one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralCoefficients {
    dt: f64,
    modes: Vec<ModeCoefficients>,
}

impl SpectralCoefficients {
    /// Evaluate every mode of `kspace` for step `dt`.
    pub fn compute(kspace: &KSpace, dt: f64) -> Self {
        let modes = kspace
            .iter()
            .map(|k| mode_coefficients((k[0] * k[0] + k[1] * k[1] + k[2] * k[2]).sqrt(), dt))
            .collect();
        Self { dt, modes }
    }

    /// The step these were computed for.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Per-mode coefficients in flat order.
    pub fn modes(&self) -> &[ModeCoefficients] {
        &self.modes
    }
}
