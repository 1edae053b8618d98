//! Wave numbers of the spectral box.

use std::f64::consts::PI;

/// Infinite-order wave numbers `k = 2 pi m' / (N dx)` along one axis, in
/// FFT output order. `m' = m` for `m < (N+1)/2` and `m - N` beyond.
pub fn wavenumbers(n: usize, dx: f64) -> Vec<f64> {
    let len = n as f64 * dx;
    (0..n)
        .map(|m| {
            let signed = if m < n.div_ceil(2) {
                m as f64
            } else {
                m as f64 - n as f64
            };
            2.0 * PI * signed / len
        })
        .collect()
}

/// The wave-number grid of a spectral box. Modes are stored with x fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct KSpace {
    extent: [usize; 3],
    dx: [f64; 3],
    k: [Vec<f64>; 3],
}

impl KSpace {
    /// Grid for a box of `extent` points with spacing `dx`. Axes of extent
    /// 1 carry the single wave number 0.
    pub fn new(extent: [usize; 3], dx: [f64; 3]) -> Self {
        Self {
            extent,
            dx,
            k: std::array::from_fn(|d| {
                if extent[d] > 1 {
                    wavenumbers(extent[d], dx[d])
                } else {
                    vec![0.0]
                }
            }),
        }
    }

    /// Points per axis.
    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    /// Grid spacing.
    pub fn dx(&self) -> [f64; 3] {
        self.dx
    }

    /// Wave numbers along axis `d`.
    pub fn axis(&self, d: usize) -> &[f64] {
        &self.k[d]
    }

    /// Number of modes.
    pub fn num_modes(&self) -> usize {
        self.extent.iter().product()
    }

    /// Flat mode index.
    pub fn flat(&self, m: [usize; 3]) -> usize {
        m[0] + self.extent[0] * (m[1] + self.extent[1] * m[2])
    }

    /// Wave vector of every mode in flat order.
    pub fn iter(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        let [nx, ny, nz] = self.extent;
        (0..nz).flat_map(move |k| {
            (0..ny).flat_map(move |j| (0..nx).map(move |i| [self.k[0][i], self.k[1][j], self.k[2][k]]))
        })
    }
}
