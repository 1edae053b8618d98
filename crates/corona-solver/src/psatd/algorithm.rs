//! The spectral solver state and its update.

use corona_core::constants::{C, EP0};
use corona_core::{FieldKind, InvariantViolation, Staggering};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use tracing::debug;

use super::coefficients::SpectralCoefficients;
use super::fft::{SpectralField, SpectralTransform};
use super::{PsatdConfig, SpectralSlot};
use crate::error::SolverError;
use crate::fields::EmFields;

type Vec3 = [Complex<f64>; 3];

fn cross(k: [f64; 3], a: Vec3) -> Vec3 {
    [
        k[1] * a[2] - k[2] * a[1],
        k[2] * a[0] - k[0] * a[2],
        k[0] * a[1] - k[1] * a[0],
    ]
}

fn dot(k: [f64; 3], a: Vec3) -> Complex<f64> {
    k[0] * a[0] + k[1] * a[1] + k[2] * a[2]
}

fn at(v: &[SpectralField; 3], m: usize) -> Vec3 {
    [v[0][m], v[1][m], v[2][m]]
}

#[derive(Clone, Debug)]
pub(super) struct SpectralState {
    pub(super) e: [SpectralField; 3],
    pub(super) b: [SpectralField; 3],
    pub(super) j: [[SpectralField; 3]; 2],
    pub(super) rho: [SpectralField; 2],
    pub(super) f: Option<SpectralField>,
    pub(super) g: Option<SpectralField>,
    pub(super) e_avg: Option<[SpectralField; 3]>,
    pub(super) b_avg: Option<[SpectralField; 3]>,
}

/// PSATD solver for one patch.
///
/// Coefficients are computed on the first push after construction or after
/// [`set_dt`](Self::set_dt) changed the step, and reused otherwise.
#[derive(Clone, Debug)]
pub struct PsatdSolver {
    config: PsatdConfig,
    pub(super) transform: SpectralTransform,
    pub(super) dt: f64,
    coefficients: Option<SpectralCoefficients>,
    pub(super) state: SpectralState,
}

impl PsatdSolver {
    /// Solver for the arrays of `fields` with step `dt`.
    pub fn new(fields: &EmFields, config: PsatdConfig, dt: f64) -> Result<Self, SolverError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::InvalidTimeStep { dt });
        }
        if config.div_e_cleaning && fields.f.is_none() {
            return Err(SolverError::MissingField { field: FieldKind::F });
        }
        if config.div_b_cleaning && fields.g.is_none() {
            return Err(SolverError::MissingField { field: FieldKind::G });
        }
        if config.time_averaging && (fields.e_avg.is_none() || fields.b_avg.is_none()) {
            return Err(SolverError::MissingField { field: FieldKind::Ex });
        }
        let transform = SpectralTransform::new(&fields.geom, fields.e[0].layout());
        let zeros = || transform.zeros();
        let vector = || [zeros(), zeros(), zeros()];
        let state = SpectralState {
            e: vector(),
            b: vector(),
            j: [vector(), vector()],
            rho: [zeros(), zeros()],
            f: config.div_e_cleaning.then(zeros),
            g: config.div_b_cleaning.then(zeros),
            e_avg: config.time_averaging.then(vector),
            b_avg: config.time_averaging.then(vector),
        };
        debug!(modes = transform.num_modes(), dt, ?config, "spectral solver allocated");
        Ok(Self {
            config,
            transform,
            dt,
            coefficients: None,
            state,
        })
    }

    /// Update options.
    pub fn config(&self) -> &PsatdConfig {
        &self.config
    }

    /// Current step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The spectral transform.
    pub fn transform(&self) -> &SpectralTransform {
        &self.transform
    }

    /// Change the step; coefficients are recomputed on the next push.
    pub fn set_dt(&mut self, dt: f64) -> Result<(), SolverError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::InvalidTimeStep { dt });
        }
        if dt != self.dt {
            self.dt = dt;
            self.coefficients = None;
        }
        Ok(())
    }

    /// Drop the cached coefficients.
    pub fn invalidate_coefficients(&mut self) {
        self.coefficients = None;
    }

    /// Whether coefficients are cached.
    pub fn has_coefficients(&self) -> bool {
        self.coefficients.is_some()
    }

    // ── Transforms ──────────────────────────────────────────────────

    /// Transform E, B, and the cleaning scalars into spectral space.
    pub fn forward_fields(&mut self, fields: &EmFields) -> Result<(), InvariantViolation> {
        let t = &self.transform;
        for d in 0..3 {
            self.state.e[d] = t.forward(&fields.e[d], fields.e[d].staggering())?;
            self.state.b[d] = t.forward(&fields.b[d], fields.b[d].staggering())?;
        }
        if let (Some(dst), Some(src)) = (self.state.f.as_mut(), fields.f.as_ref()) {
            *dst = t.forward(src, src.staggering())?;
        }
        if let (Some(dst), Some(src)) = (self.state.g.as_mut(), fields.g.as_ref()) {
            *dst = t.forward(src, src.staggering())?;
        }
        Ok(())
    }

    /// Transform the current into `slot`. With Vay deposition the arrays
    /// hold `D` and are converted to J.
    pub fn forward_current(&mut self, fields: &EmFields, slot: SpectralSlot) -> Result<(), InvariantViolation> {
        if self.config.vay_deposition {
            let t = &self.transform;
            let d = [
                t.forward(&fields.j[0], Staggering::NODAL)?,
                t.forward(&fields.j[1], Staggering::NODAL)?,
                t.forward(&fields.j[2], Staggering::NODAL)?,
            ];
            self.vay_to_current(d, slot);
            return Ok(());
        }
        for d in 0..3 {
            self.state.j[slot.index()][d] = self.transform.forward(&fields.j[d], fields.j[d].staggering())?;
        }
        Ok(())
    }

    /// Transform the charge density of the same slot into `slot`.
    pub fn forward_rho(&mut self, fields: &EmFields, slot: SpectralSlot) -> Result<(), InvariantViolation> {
        let src = &fields.rho[slot.index()];
        self.state.rho[slot.index()] = self.transform.forward(src, Staggering::NODAL)?;
        Ok(())
    }

    /// Write E, B, and the cleaning scalars back to real space.
    pub fn backward_fields(&self, fields: &mut EmFields) -> Result<(), InvariantViolation> {
        let t = &self.transform;
        for d in 0..3 {
            let stag = fields.e[d].staggering();
            t.backward(&self.state.e[d], stag, &mut fields.e[d])?;
            let stag = fields.b[d].staggering();
            t.backward(&self.state.b[d], stag, &mut fields.b[d])?;
        }
        if let (Some(src), Some(dst)) = (self.state.f.as_ref(), fields.f.as_mut()) {
            let stag = dst.staggering();
            t.backward(src, stag, dst)?;
        }
        if let (Some(src), Some(dst)) = (self.state.g.as_ref(), fields.g.as_mut()) {
            let stag = dst.staggering();
            t.backward(src, stag, dst)?;
        }
        Ok(())
    }

    /// Write the new current slot back to real space with J staggering.
    pub fn backward_current(&self, fields: &mut EmFields) -> Result<(), InvariantViolation> {
        let new = &self.state.j[SpectralSlot::New.index()];
        for d in 0..3 {
            let stag = fields.j[d].kind().staggering();
            self.transform.backward(&new[d], stag, &mut fields.j[d])?;
        }
        Ok(())
    }

    /// Copy the new spectral current into the old slot.
    pub fn move_current_new_to_old(&mut self) {
        let [old, new] = &mut self.state.j;
        for d in 0..3 {
            old[d].clone_from(&new[d]);
        }
    }

    /// Copy the new spectral charge density into the old slot.
    pub fn move_rho_new_to_old(&mut self) {
        let [old, new] = &mut self.state.rho;
        old.clone_from(new);
    }

    // ── Time averages ───────────────────────────────────────────────

    /// Zero the accumulated averages.
    pub fn erase_averages(&mut self) {
        for v in self.state.e_avg.iter_mut().chain(self.state.b_avg.iter_mut()) {
            for c in v.iter_mut() {
                c.fill(Complex::zero());
            }
        }
    }

    /// Write `scale` times the accumulated averages into the averaged arrays.
    pub fn backward_averages(&self, fields: &mut EmFields, scale: f64) -> Result<(), InvariantViolation> {
        let pairs = [
            (self.state.e_avg.as_ref(), fields.e_avg.as_mut()),
            (self.state.b_avg.as_ref(), fields.b_avg.as_mut()),
        ];
        for (src, dst) in pairs {
            let (Some(src), Some(dst)) = (src, dst) else {
                continue;
            };
            for d in 0..3 {
                let scaled: SpectralField = src[d].iter().map(|v| *v * scale).collect();
                let stag = dst[d].staggering();
                self.transform.backward(&scaled, stag, &mut dst[d])?;
            }
        }
        Ok(())
    }

    // ── Update ──────────────────────────────────────────────────────

    /// Advance the spectral fields by one step using the stored sources.
    ///
    /// When time averaging is on, `(before + after) dt / 2` is added to the
    /// spectral averages.
    pub fn push_spectral(&mut self) {
        let dt = self.dt;
        let transform = &self.transform;
        let coefficients = self
            .coefficients
            .get_or_insert_with(|| SpectralCoefficients::compute(transform.kspace(), dt));
        let cfg = self.config;
        let st = &mut self.state;
        let i = Complex::<f64>::i();
        let c2 = C * C;
        let zero = [Complex::zero(); 3];
        let modes = transform.kspace().iter().zip(coefficients.modes());
        for (m, (k, co)) in modes.enumerate() {
            let e = at(&st.e, m);
            let b = at(&st.b, m);
            let j_new = at(&st.j[1], m);
            let (j, dj) = if cfg.j_linear {
                let j_old = at(&st.j[0], m);
                (j_old, std::array::from_fn(|d| j_new[d] - j_old[d]))
            } else {
                (j_new, zero)
            };
            let k_dot_e = dot(k, e);
            let k_dot_j = dot(k, j);
            let (rho_old, rho_new) = if cfg.update_with_rho {
                (st.rho[0][m], st.rho[1][m])
            } else {
                let old = EP0 * i * k_dot_e;
                (old, old - dt * i * k_dot_j)
            };
            let f_old = st.f.as_ref().map(|f| f[m]);
            let g_old = st.g.as_ref().map(|g| g[m]);

            let k_x_e = cross(k, e);
            let k_x_b = cross(k, b);
            let k_x_j = cross(k, j);
            let k_x_dj = cross(k, dj);
            let rho_term = co.x2 * rho_new - co.x3 * rho_old;

            let mut e_new = [Complex::zero(); 3];
            let mut b_new = [Complex::zero(); 3];
            for d in 0..3 {
                e_new[d] = co.c * e[d] + i * c2 * co.s_ck * k_x_b[d]
                    - co.s_ck / EP0 * j[d]
                    - i * k[d] * rho_term;
                b_new[d] = co.c * b[d] - i * co.s_ck * k_x_e[d] + i * co.x1 * k_x_j[d];
                if let Some(f) = f_old {
                    e_new[d] += i * c2 * co.s_ck * k[d] * f;
                }
                if let Some(g) = g_old {
                    b_new[d] += i * c2 * co.s_ck * k[d] * g;
                }
                if cfg.j_linear {
                    e_new[d] -= co.x1 * dj[d] / dt;
                    b_new[d] += i * (co.x2 / c2) * k_x_dj[d];
                }
            }

            if let (Some(f), Some(f_old)) = (st.f.as_mut(), f_old) {
                let mut value = co.c * f_old + co.s_ck * (i * k_dot_e - rho_old / EP0)
                    - co.x1 * ((rho_new - rho_old) / dt + i * k_dot_j);
                if cfg.j_linear {
                    value -= (co.x2 / c2) * i * dot(k, dj);
                }
                f[m] = value;
            }
            if let (Some(g), Some(g_old)) = (st.g.as_mut(), g_old) {
                g[m] = co.c * g_old + i * co.s_ck * dot(k, b);
            }
            if let Some(avg) = st.e_avg.as_mut() {
                for d in 0..3 {
                    avg[d][m] += (e[d] + e_new[d]) * (0.5 * dt);
                }
            }
            if let Some(avg) = st.b_avg.as_mut() {
                for d in 0..3 {
                    avg[d][m] += (b[d] + b_new[d]) * (0.5 * dt);
                }
            }
            for d in 0..3 {
                st.e[d][m] = e_new[d];
                st.b[d][m] = b_new[d];
            }
        }
    }

    /// One full step with a single current deposit already in `fields.j`:
    /// forward transforms, optional current correction, the spectral push,
    /// and the backward transform of E, B, F, G.
    pub fn advance(&mut self, fields: &mut EmFields) -> Result<(), InvariantViolation> {
        self.forward_fields(fields)?;
        self.forward_current(fields, SpectralSlot::New)?;
        if self.config.needs_rho() {
            self.forward_rho(fields, SpectralSlot::Old)?;
            self.forward_rho(fields, SpectralSlot::New)?;
        }
        if self.config.current_correction {
            self.current_correction();
        }
        if self.config.current_correction || self.config.vay_deposition {
            self.backward_current(fields)?;
        }
        self.push_spectral();
        self.backward_fields(fields)
    }
}
