//! Relativistic particle pushers.
//!
//! Momenta are stored as `u = γv` in m/s. Every pusher takes the half
//! impulse factor `qmt = q dt / (2m)` and returns the advanced momentum.

use rayon::prelude::*;

use corona_core::constants::C;
use corona_core::{InvariantViolation, ParticleId};

use crate::container::ParticleContainer;
use crate::gather::FieldRefs;
use crate::shape::{self, ShapeOrder};
use crate::tile::lorentz_factor;

/// Momentum update scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PusherKind {
    /// Boris rotation.
    #[default]
    Boris,
    /// Vay (2008), exact for crossed E and B.
    Vay,
    /// Higuera-Cary (2017), volume preserving with the correct E x B drift.
    HigueraCary,
}

impl PusherKind {
    /// Advance momentum `u` through fields `e`, `b` with `qmt = q dt / 2m`.
    pub fn advance(self, u: [f64; 3], e: [f64; 3], b: [f64; 3], qmt: f64) -> [f64; 3] {
        match self {
            Self::Boris => boris(u, e, b, qmt),
            Self::Vay => vay(u, e, b, qmt),
            Self::HigueraCary => higuera_cary(u, e, b, qmt),
        }
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn axpy(a: f64, x: [f64; 3], y: [f64; 3]) -> [f64; 3] {
    [y[0] + a * x[0], y[1] + a * x[1], y[2] + a * x[2]]
}

fn boris(u: [f64; 3], e: [f64; 3], b: [f64; 3], qmt: f64) -> [f64; 3] {
    let u_minus = axpy(qmt, e, u);
    let inv_gamma = 1.0 / lorentz_factor(u_minus);
    let t = b.map(|c| qmt * inv_gamma * c);
    let s_factor = 2.0 / (1.0 + dot(t, t));
    let s = t.map(|c| c * s_factor);
    let u_prime = axpy(1.0, cross(u_minus, t), u_minus);
    let u_plus = axpy(1.0, cross(u_prime, s), u_minus);
    axpy(qmt, e, u_plus)
}

fn vay(u: [f64; 3], e: [f64; 3], b: [f64; 3], qmt: f64) -> [f64; 3] {
    let inv_gamma = 1.0 / lorentz_factor(u);
    let v = u.map(|c| c * inv_gamma);
    // Full electric impulse plus the half magnetic impulse at the old velocity.
    let u_half = axpy(qmt, cross(v, b), axpy(2.0 * qmt, e, u));
    let tau = b.map(|c| qmt * c);
    let tau_sq = dot(tau, tau);
    let u_star = dot(u_half, tau) / C;
    let gamma_prime_sq = 1.0 + dot(u_half, u_half) / (C * C);
    let sigma = gamma_prime_sq - tau_sq;
    let inv_gamma_new_sq =
        2.0 / (sigma + (sigma * sigma + 4.0 * (tau_sq + u_star * u_star)).sqrt());
    let inv_gamma_new = inv_gamma_new_sq.sqrt();
    let t = tau.map(|c| c * inv_gamma_new);
    let s = 1.0 / (1.0 + dot(t, t));
    let tu = dot(t, u_half);
    let r = cross(u_half, t);
    std::array::from_fn(|d| s * (u_half[d] + t[d] * tu + r[d]))
}

fn higuera_cary(u: [f64; 3], e: [f64; 3], b: [f64; 3], qmt: f64) -> [f64; 3] {
    let u_minus = axpy(qmt, e, u);
    let gamma_minus_sq = 1.0 + dot(u_minus, u_minus) / (C * C);
    let tau = b.map(|c| qmt * c);
    let tau_sq = dot(tau, tau);
    let u_star = dot(u_minus, tau) / C;
    let sigma = gamma_minus_sq - tau_sq;
    let gamma_new =
        (0.5 * (sigma + (sigma * sigma + 4.0 * (tau_sq + u_star * u_star)).sqrt())).sqrt();
    let t = tau.map(|c| c / gamma_new);
    let s = 1.0 / (1.0 + dot(t, t));
    let tu = dot(t, u_minus);
    let r = cross(u_minus, t);
    let u_plus: [f64; 3] = std::array::from_fn(|d| s * (u_minus[d] + t[d] * tu + r[d]));
    let rotated: [f64; 3] = std::array::from_fn(|d| 2.0 * u_plus[d] - u_minus[d]);
    axpy(qmt, e, rotated)
}

/// Settings shared by every particle of one push.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PushParams {
    /// Momentum update scheme.
    pub pusher: PusherKind,
    /// Gather shape order.
    pub order: ShapeOrder,
    /// Guard width the gather reads.
    pub gather_ng: usize,
    /// Mesh level being pushed.
    pub level: usize,
}

impl ParticleContainer {
    /// Advance momenta on level `lev` by `dt` through the fields in
    /// `fields`. A negative `dt` moves momenta backward, which is how the
    /// leapfrog desynchronizes and resynchronizes.
    pub fn push_momentum(
        &mut self,
        lev: usize,
        fields: &FieldRefs<'_>,
        dt: f64,
        params: &PushParams,
    ) -> Result<(), InvariantViolation> {
        fields.require_guards(params.gather_ng)?;
        let qmt = self.species().charge() * dt / (2.0 * self.species().mass());
        let tiles: Vec<_> = self.tiles_mut(lev)?.values_mut().collect();
        tiles.into_par_iter().try_for_each(|tile| {
            for i in 0..tile.len() {
                if !ParticleId(tile.id[i]).is_valid() {
                    continue;
                }
                let pos = tile.position(i);
                shape::check_allowance(fields.geom, pos, params.gather_ng, params.order, params.level)?;
                let (e, b) = fields.gather(params.order, pos);
                let u = params.pusher.advance(tile.momentum(i), e, b, qmt);
                tile.set_momentum(i, u);
            }
            Ok(())
        })
    }

    /// Advance positions on level `lev` by `dt` at the current velocity.
    pub fn push_position(&mut self, lev: usize, dt: f64) -> Result<(), InvariantViolation> {
        let tiles: Vec<_> = self.tiles_mut(lev)?.values_mut().collect();
        tiles.into_par_iter().for_each(|tile| {
            for i in 0..tile.len() {
                let v = tile.velocity(i);
                let p = tile.position(i);
                tile.set_position(i, std::array::from_fn(|d| p[d] + v[d] * dt));
            }
        });
        Ok(())
    }

    /// Momentum then position advance by `dt`.
    pub fn push(
        &mut self,
        lev: usize,
        fields: &FieldRefs<'_>,
        dt: f64,
        params: &PushParams,
    ) -> Result<(), InvariantViolation> {
        self.push_momentum(lev, fields, dt, params)?;
        self.push_position(lev, dt)
    }
}
