//! Real-space to spectral-space transforms of staggered arrays.
//!
//! Along a periodic axis the spectral box is the valid region `[0, n)`.
//! Along a non-periodic axis it is the whole allocated range, guards
//! included, so that a patch surrounded by guard data sees no wrap-around
//! from its own opposite face. Backward transforms write the valid region
//! only and leave guards stale.

use std::fmt;
use std::sync::Arc;

use corona_core::{InvariantViolation, Staggering};
use corona_grid::{FieldArray, Geometry, IndexBox, Layout};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use super::kspace::KSpace;

/// Complex spectral samples of one component, x fastest.
pub type SpectralField = Vec<Complex<f64>>;

/// Axis-by-axis FFTs over a fixed spectral box.
#[derive(Clone)]
pub struct SpectralTransform {
    region: IndexBox,
    layout: Layout,
    kspace: KSpace,
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
    // exp(-i k dx/2) per axis, the shift of a cell-centered sample.
    half_shift: [Vec<Complex<f64>>; 3],
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("region", &self.region)
            .field("extent", &self.kspace.extent())
            .finish_non_exhaustive()
    }
}

fn transform_axis(data: &mut [Complex<f64>], extent: [usize; 3], d: usize, fft: &dyn Fft<f64>) {
    let n = extent[d];
    if n <= 1 {
        return;
    }
    let stride: usize = extent[..d].iter().product();
    let lines = data.len() / n;
    let mut line = vec![Complex::zero(); n];
    let mut scratch = vec![Complex::zero(); fft.get_inplace_scratch_len()];
    for l in 0..lines {
        let base = l % stride + (l / stride) * stride * n;
        for (i, v) in line.iter_mut().enumerate() {
            *v = data[base + i * stride];
        }
        fft.process_with_scratch(&mut line, &mut scratch);
        for (i, v) in line.iter().enumerate() {
            data[base + i * stride] = *v;
        }
    }
}

impl SpectralTransform {
    /// Transform for arrays with `layout` on `geom`.
    pub fn new(geom: &Geometry, layout: &Layout) -> Self {
        let valid = layout.valid_box();
        let alloc = layout.allocated_box();
        let periodic = geom.periodic();
        let region = IndexBox::new(
            std::array::from_fn(|d| if periodic[d] { valid.lo[d] } else { alloc.lo[d] }),
            std::array::from_fn(|d| if periodic[d] { valid.hi[d] } else { alloc.hi[d] }),
        );
        let extent = region.extent();
        let dx = geom.dx();
        let kspace = KSpace::new(extent, dx);
        let mut planner = FftPlanner::new();
        let forward = extent.map(|n| planner.plan_fft_forward(n));
        let inverse = extent.map(|n| planner.plan_fft_inverse(n));
        let half_shift = std::array::from_fn(|d| {
            kspace
                .axis(d)
                .iter()
                .map(|k| Complex::from_polar(1.0, -0.5 * k * dx[d]))
                .collect()
        });
        Self {
            region,
            layout: *layout,
            kspace,
            forward,
            inverse,
            half_shift,
        }
    }

    /// The wave-number grid.
    pub fn kspace(&self) -> &KSpace {
        &self.kspace
    }

    /// Index box that is transformed.
    pub fn region(&self) -> IndexBox {
        self.region
    }

    /// Number of spectral samples per component.
    pub fn num_modes(&self) -> usize {
        self.kspace.num_modes()
    }

    /// A zeroed spectral buffer.
    pub fn zeros(&self) -> SpectralField {
        vec![Complex::zero(); self.num_modes()]
    }

    fn check(&self, a: &FieldArray) -> Result<(), InvariantViolation> {
        if *a.layout() == self.layout {
            Ok(())
        } else {
            Err(InvariantViolation::ShapeMismatch {
                expected: self.layout.n(),
                found: a.layout().n(),
            })
        }
    }

    fn shift(&self, data: &mut [Complex<f64>], stag: Staggering, conjugate: bool) {
        let cell_axes: Vec<usize> = (0..3)
            .filter(|&d| !stag.nodal[d] && self.kspace.extent()[d] > 1)
            .collect();
        if cell_axes.is_empty() {
            return;
        }
        let [nx, ny, nz] = self.kspace.extent();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let m = [i, j, k];
                    let mut factor = Complex::new(1.0, 0.0);
                    for &d in &cell_axes {
                        factor *= self.half_shift[d][m[d]];
                    }
                    if conjugate {
                        factor = factor.conj();
                    }
                    data[self.kspace.flat(m)] *= factor;
                }
            }
        }
    }

    /// Spectral samples of `a`, taken as if its samples sat at `stag`.
    pub fn forward(&self, a: &FieldArray, stag: Staggering) -> Result<SpectralField, InvariantViolation> {
        self.check(a)?;
        let mut data: SpectralField = self
            .region
            .iter()
            .map(|idx| Complex::new(a.get(idx), 0.0))
            .collect();
        let extent = self.kspace.extent();
        for d in 0..3 {
            transform_axis(&mut data, extent, d, self.forward[d].as_ref());
        }
        self.shift(&mut data, stag, false);
        Ok(data)
    }

    /// Write the real part of the inverse transform of `data`, evaluated at
    /// `stag`, into the valid region of `a`.
    pub fn backward(
        &self,
        data: &[Complex<f64>],
        stag: Staggering,
        a: &mut FieldArray,
    ) -> Result<(), InvariantViolation> {
        self.check(a)?;
        let mut work = data.to_vec();
        self.shift(&mut work, stag, true);
        let extent = self.kspace.extent();
        for d in 0..3 {
            transform_axis(&mut work, extent, d, self.inverse[d].as_ref());
        }
        let norm = 1.0 / self.num_modes() as f64;
        let lo = self.region.lo;
        // Across a staggering change the Nyquist mode comes back purely
        // imaginary; its real part, zero, is the mode's value half way
        // between samples.
        for idx in self.layout.valid_box().iter() {
            let m: [usize; 3] = std::array::from_fn(|d| (idx[d] - lo[d]) as usize);
            a.set(idx, work[self.kspace.flat(m)].re * norm);
        }
        a.invalidate_guards();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_core::FieldKind;
    use corona_grid::Dim;
    use std::f64::consts::PI;

    fn geom(periodic: bool) -> Geometry {
        Geometry::xz([8, 4], [0.5, 2.0], [0.0, 0.0], [periodic; 2]).unwrap()
    }

    fn filled(kind: FieldKind, g: &Geometry) -> FieldArray {
        let mut a = FieldArray::new(kind, g, 2);
        for idx in a.layout().valid_box().iter() {
            a.set(idx, (idx[0] * 3 - idx[2] * 5) as f64 + 0.25);
        }
        a
    }

    #[test]
    fn round_trip_restores_valid_region() {
        for periodic in [true, false] {
            let g = geom(periodic);
            let a = filled(FieldKind::Ex, &g);
            let t = SpectralTransform::new(&g, a.layout());
            let spec = t.forward(&a, a.staggering()).unwrap();
            let mut b = FieldArray::new(FieldKind::Ex, &g, 2);
            t.backward(&spec, a.staggering(), &mut b).unwrap();
            for idx in a.layout().valid_box().iter() {
                assert!((a.get(idx) - b.get(idx)).abs() < 1e-12, "{idx:?}");
            }
            assert_eq!(b.guard_valid(), 0);
        }
    }

    #[test]
    fn staggered_backward_interpolates_a_resolved_mode() {
        // A nodal cosine read back at cell centers lands on cos(k (i + 1/2) dx).
        let g = Geometry::new(Dim::Three, [16, 1, 1], [0.1, 1.0, 1.0], [0.0; 3], [true; 3]).unwrap();
        let mut a = FieldArray::new(FieldKind::Rho, &g, 1);
        let k = 2.0 * PI / 1.6;
        for idx in a.layout().valid_box().iter() {
            a.set(idx, (k * idx[0] as f64 * 0.1).cos());
        }
        let t = SpectralTransform::new(&g, a.layout());
        let spec = t.forward(&a, Staggering::NODAL).unwrap();
        let mut b = FieldArray::new(FieldKind::G, &g, 1);
        t.backward(&spec, Staggering::CELL, &mut b).unwrap();
        for i in 0..16 {
            let expected = (k * (i as f64 + 0.5) * 0.1).cos();
            assert!((b.get([i, 0, 0]) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn nyquist_mode_vanishes_between_samples() {
        let g = Geometry::new(Dim::Three, [16, 1, 1], [0.1, 1.0, 1.0], [0.0; 3], [true; 3]).unwrap();
        let mut a = FieldArray::new(FieldKind::Rho, &g, 1);
        for idx in a.layout().valid_box().iter() {
            a.set(idx, if idx[0] % 2 == 0 { 1.0 } else { -1.0 });
        }
        let t = SpectralTransform::new(&g, a.layout());
        let spec = t.forward(&a, Staggering::NODAL).unwrap();

        let mut same = FieldArray::new(FieldKind::Rho, &g, 1);
        t.backward(&spec, Staggering::NODAL, &mut same).unwrap();
        let mut shifted = FieldArray::new(FieldKind::G, &g, 1);
        t.backward(&spec, Staggering::CELL, &mut shifted).unwrap();
        for i in 0..16 {
            assert!((same.get([i, 0, 0]) - a.get([i, 0, 0])).abs() < 1e-12);
            assert!(shifted.get([i, 0, 0]).abs() < 1e-12, "{i}");
        }
    }

    #[test]
    fn foreign_layout_is_rejected() {
        let g = geom(true);
        let t = SpectralTransform::new(&g, FieldArray::new(FieldKind::Ex, &g, 2).layout());
        let other = FieldArray::new(FieldKind::Ex, &g, 3);
        assert!(t.forward(&other, Staggering::NODAL).is_err());
    }
}
