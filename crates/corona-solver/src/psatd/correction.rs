//! Spectral-space source corrections.

use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use super::algorithm::PsatdSolver;
use super::fft::SpectralField;
use super::SpectralSlot;

impl PsatdSolver {
    /// Project the new current so that `i k . J = -(rho_new - rho_old)/dt`
    /// holds mode by mode. The `k = 0` mode is left unchanged.
    pub fn current_correction(&mut self) {
        let i = Complex::<f64>::i();
        let dt = self.dt;
        let st = &mut self.state;
        let [rho_old, rho_new] = &st.rho;
        let j = &mut st.j[SpectralSlot::New.index()];
        for (m, k) in self.transform.kspace().iter().enumerate() {
            let k2 = k[0] * k[0] + k[1] * k[1] + k[2] * k[2];
            if k2 == 0.0 {
                continue;
            }
            let k_dot_j = k[0] * j[0][m] + k[1] * j[1][m] + k[2] * j[2][m];
            let residual = (rho_new[m] - rho_old[m]) / dt + i * k_dot_j;
            for d in 0..3 {
                j[d][m] += i * k[d] * residual / k2;
            }
        }
    }

    /// Turn spectral Vay `D` components into J: `J_d = D_d / (i k_d)`, zero
    /// where `k_d` vanishes. An axis of extent 1 carries J directly.
    pub(super) fn vay_to_current(&mut self, d: [SpectralField; 3], slot: SpectralSlot) {
        let i = Complex::<f64>::i();
        let kspace = self.transform.kspace();
        let extent = kspace.extent();
        let target = &mut self.state.j[slot.index()];
        for (axis, (dst, src)) in target.iter_mut().zip(d).enumerate() {
            if extent[axis] == 1 {
                *dst = src;
                continue;
            }
            for (m, k) in kspace.iter().enumerate() {
                dst[m] = if k[axis] == 0.0 {
                    Complex::zero()
                } else {
                    src[m] / (i * k[axis])
                };
            }
        }
    }
}
