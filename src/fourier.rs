//! 2-D Fourier transforms over `ndarray` grids.
//!
//! Thin wrapper around `rustfft` planned transforms: a forward and inverse
//! plan per axis length, applied row-wise and column-wise. The inverse
//! transform carries the 1/N normalization explicitly so a forward/inverse
//! round trip is the identity. `fftshift`/`ifftshift` move the grid center
//! between the array midpoint and index (0, 0), matching the usual DFT
//! layout conventions.

use ndarray::Array2;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Planned 2-D FFT for a fixed grid shape.
///
/// Plans are cheap to clone (`Arc`) and safe to share across threads, so a
/// single instance can serve all depths of a z-stack in parallel.
#[derive(Clone)]
pub struct Fft2d {
    rows: usize,
    cols: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Fft2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft2d")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Fft2d {
    /// Plan forward and inverse transforms for a (rows, cols) grid
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            rows,
            cols,
            row_forward: planner.plan_fft_forward(cols),
            row_inverse: planner.plan_fft_inverse(cols),
            col_forward: planner.plan_fft_forward(rows),
            col_inverse: planner.plan_fft_inverse(rows),
        }
    }

    /// Grid shape this plan was built for
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Forward 2-D DFT (no normalization)
    pub fn forward(&self, input: &Array2<Complex64>) -> Array2<Complex64> {
        assert_eq!(input.dim(), (self.rows, self.cols));
        let mut out = input.clone();
        self.transform_in_place(&mut out, &self.row_forward, &self.col_forward);
        out
    }

    /// Inverse 2-D DFT, normalized by 1/(rows*cols)
    pub fn inverse(&self, input: &Array2<Complex64>) -> Array2<Complex64> {
        assert_eq!(input.dim(), (self.rows, self.cols));
        let mut out = input.clone();
        self.transform_in_place(&mut out, &self.row_inverse, &self.col_inverse);
        let scale = 1.0 / (self.rows * self.cols) as f64;
        out.mapv_inplace(|v| v * scale);
        out
    }

    fn transform_in_place(
        &self,
        grid: &mut Array2<Complex64>,
        row_plan: &Arc<dyn Fft<f64>>,
        col_plan: &Arc<dyn Fft<f64>>,
    ) {
        // Rows are contiguous in standard layout
        for mut row in grid.rows_mut() {
            let slice = row
                .as_slice_mut()
                .expect("row-major grid rows are contiguous");
            row_plan.process(slice);
        }
        // Columns go through a scratch buffer
        let mut buffer = vec![Complex64::new(0.0, 0.0); self.rows];
        for c in 0..self.cols {
            for r in 0..self.rows {
                buffer[r] = grid[[r, c]];
            }
            col_plan.process(&mut buffer);
            for r in 0..self.rows {
                grid[[r, c]] = buffer[r];
            }
        }
    }
}

/// Cyclic shift moving the array midpoint to index (0, 0) and vice versa.
fn roll2<T: Clone>(a: &Array2<T>, shift_r: usize, shift_c: usize) -> Array2<T> {
    let (rows, cols) = a.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        a[[(r + shift_r) % rows, (c + shift_c) % cols]].clone()
    })
}

/// Move the zero-frequency / grid-center element from index (0, 0) to the
/// array midpoint (`floor(n/2)` per axis).
pub fn fftshift<T: Clone>(a: &Array2<T>) -> Array2<T> {
    let (rows, cols) = a.dim();
    roll2(a, rows.div_ceil(2), cols.div_ceil(2))
}

/// Inverse of [`fftshift`]: move the array midpoint back to index (0, 0).
pub fn ifftshift<T: Clone>(a: &Array2<T>) -> Array2<T> {
    let (rows, cols) = a.dim();
    roll2(a, rows / 2, cols / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_round_trip_identity() {
        let fft = Fft2d::new(4, 6);
        let input = Array2::from_shape_fn((4, 6), |(r, c)| {
            Complex64::new((r * 6 + c) as f64, (r as f64) - (c as f64))
        });
        let out = fft.inverse(&fft.forward(&input));
        for (a, b) in input.iter().zip(out.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dc_component() {
        let fft = Fft2d::new(3, 3);
        let input = Array2::from_elem((3, 3), Complex64::new(2.0, 0.0));
        let out = fft.forward(&input);
        assert_relative_eq!(out[[0, 0]].re, 18.0, epsilon = 1e-12);
        for ((r, c), v) in out.indexed_iter() {
            if (r, c) != (0, 0) {
                assert_relative_eq!(v.norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_parseval() {
        let fft = Fft2d::new(8, 8);
        let input = Array2::from_shape_fn((8, 8), |(r, c)| {
            Complex64::new((r as f64 * 0.3).sin(), (c as f64 * 0.7).cos())
        });
        let spatial_energy: f64 = input.iter().map(|v| v.norm_sqr()).sum();
        let spectrum = fft.forward(&input);
        let spectral_energy: f64 = spectrum.iter().map(|v| v.norm_sqr()).sum::<f64>() / 64.0;
        assert_relative_eq!(spatial_energy, spectral_energy, epsilon = 1e-9);
    }

    #[test]
    fn test_fftshift_even() {
        let a = array![[0, 1], [2, 3]];
        let shifted = fftshift(&a);
        assert_eq!(shifted, array![[3, 2], [1, 0]]);
        assert_eq!(ifftshift(&shifted), a);
    }

    #[test]
    fn test_shift_odd_round_trip() {
        let a = Array2::from_shape_fn((5, 3), |(r, c)| r * 3 + c);
        assert_eq!(ifftshift(&fftshift(&a)), a);
        assert_eq!(fftshift(&ifftshift(&a)), a);
        // Midpoint lands at the origin under ifftshift
        assert_eq!(ifftshift(&a)[[0, 0]], a[[2, 1]]);
    }
}
