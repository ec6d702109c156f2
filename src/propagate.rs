//! Defocus propagation of the pupil to real-space PSF kernels.
//!
//! For each requested depth `z` the pupil is multiplied by the defocus
//! phase `exp(i k z sqrt(1 - (NA rho / n_medium)^2))` with `k = 2 pi /
//! wavelength` and `z` in sample-plane pixels (converted to physical length
//! internally). A 2-D inverse Fourier transform of the centered pupil gives
//! the complex field at that depth; the intensity kernel is its squared
//! magnitude.
//!
//! # Normalization convention
//!
//! Every kernel is renormalized so its sum over the padded grid equals one.
//! Convolving with a unit-sum kernel preserves the scatterer's total
//! intensity regardless of depth or aberration, which is the invariant the
//! image former relies on. Pupil energy is *not* preserved; mixing the two
//! conventions would break the energy tests.
//!
//! Depths are independent and are computed in parallel, assembled back in
//! the requested order.

use crate::fourier::{fftshift, ifftshift, Fft2d};
use crate::pupil::Pupil;
use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;
use thiserror::Error;

/// Error types for PSF propagation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error(
        "defocus phase undefined on the optical axis: NA {na} exceeds medium index {medium_index}"
    )]
    DepthOutOfRange { na: f64, medium_index: f64 },
}

/// Defocus phase model applied per depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefocusModel {
    /// Full square-root propagation factor
    #[default]
    Exact,
    /// Second-order (paraxial) expansion of the square root
    Paraxial,
}

/// Computes a stack of PSF intensity kernels from a pupil.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsfPropagator {
    model: DefocusModel,
}

impl PsfPropagator {
    /// Propagator with the exact defocus factor
    pub fn new() -> Self {
        Self::default()
    }

    /// Propagator with an explicit defocus model
    pub fn with_model(model: DefocusModel) -> Self {
        Self { model }
    }

    /// Compute one intensity kernel per depth, in the requested order.
    ///
    /// Fails eagerly with [`PropagationError::DepthOutOfRange`] when the
    /// configuration puts `NA / n_medium` above 1, which would make the
    /// square-root argument negative already on the axis. Points with
    /// `rho > 1` carry zero pupil amplitude and contribute nothing, so
    /// they never need the check.
    pub fn propagate(&self, pupil: &Pupil, depths: &[f64]) -> Result<PsfVolume, PropagationError> {
        let spec = pupil.spec();
        if spec.na > spec.refractive_index_medium {
            return Err(PropagationError::DepthOutOfRange {
                na: spec.na,
                medium_index: spec.refractive_index_medium,
            });
        }

        let (rows, cols) = pupil.grid().shape();
        let fft = Fft2d::new(rows, cols);
        let k = 2.0 * PI / spec.wavelength;
        let pitch = spec.sample_pixel_pitch();
        let na_over_n = spec.na / spec.refractive_index_medium;

        // Depth-independent part of the defocus phase, per grid point
        let model = self.model;
        let axial_factor = pupil.grid().rho.mapv(|rho| {
            let s = (na_over_n * rho).min(1.0);
            match model {
                DefocusModel::Exact => (1.0 - s * s).sqrt(),
                DefocusModel::Paraxial => 1.0 - s * s / 2.0,
            }
        });

        log::debug!(
            "propagating {}x{} pupil to {} depths ({:?} defocus)",
            rows,
            cols,
            depths.len(),
            model
        );

        let kernels: Vec<Array2<f64>> = depths
            .par_iter()
            .map(|&z| {
                let z_phys = z * pitch;
                let mut defocused = pupil.values().clone();
                for (v, &factor) in defocused.iter_mut().zip(axial_factor.iter()) {
                    *v *= Complex64::from_polar(1.0, k * z_phys * factor);
                }
                let field = fft.inverse(&ifftshift(&defocused));
                let mut kernel = fftshift(&field.mapv(|v| v.norm_sqr()));
                let total: f64 = kernel.sum();
                if total > 0.0 {
                    kernel.mapv_inplace(|v| v / total);
                }
                kernel
            })
            .collect();

        Ok(PsfVolume {
            depths: depths.to_vec(),
            kernels,
            grid_shape: (rows, cols),
        })
    }
}

/// Ordered stack of real, non-negative, unit-sum PSF kernels.
///
/// Kernels are stored centered on the grid (peak near the midpoint for an
/// unaberrated in-focus pupil) so slices at different depths are directly
/// comparable. Consumed read-only by the image former.
#[derive(Debug, Clone)]
pub struct PsfVolume {
    depths: Vec<f64>,
    kernels: Vec<Array2<f64>>,
    grid_shape: (usize, usize),
}

impl PsfVolume {
    /// Depths in the order they were requested
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    /// One centered intensity kernel per depth, same order as [`depths`](Self::depths)
    pub fn kernels(&self) -> &[Array2<f64>] {
        &self.kernels
    }

    /// Shape of the padded grid every kernel lives on
    pub fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    /// Number of depths in the stack
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// True when no depths were requested
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Iterate (depth, kernel) pairs in request order
    pub fn iter(&self) -> impl Iterator<Item = (f64, &Array2<f64>)> {
        self.depths.iter().copied().zip(self.kernels.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aberration::{Aberration, NamedAberration};
    use crate::pupil::PupilSpec;
    use crate::region::{OutputRegion, Padding};
    use approx::assert_relative_eq;

    fn test_pupil(terms: &[Aberration]) -> Pupil {
        let spec = PupilSpec::new(
            0.3,
            530e-9,
            1e-6,
            10.0,
            OutputRegion::new(0, 0, 48, 48),
            Padding::uniform(32),
        )
        .unwrap();
        Pupil::build(&spec, terms)
    }

    #[test]
    fn test_kernels_are_unit_sum_and_nonnegative() {
        let pupil = test_pupil(&[]);
        let volume = PsfPropagator::new()
            .propagate(&pupil, &[-100.0, 0.0, 100.0])
            .unwrap();
        assert_eq!(volume.len(), 3);
        assert_eq!(volume.grid_shape(), (112, 112));
        for (_, kernel) in volume.iter() {
            assert_relative_eq!(kernel.sum(), 1.0, epsilon = 1e-9);
            assert!(kernel.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_energy_invariant_across_aberrations() {
        // Phase aberrations redistribute energy, never create or destroy it
        for terms in [
            vec![],
            vec![Aberration::named(NamedAberration::Defocus, 1.0)],
            vec![Aberration::named(NamedAberration::VerticalComa, 0.7)],
            vec![Aberration::zernike(&[2, 3], &[0, 1], &[0.5, 0.3]).unwrap()],
        ] {
            let pupil = test_pupil(&terms);
            let volume = PsfPropagator::new().propagate(&pupil, &[-50.0, 25.0]).unwrap();
            for (_, kernel) in volume.iter() {
                assert_relative_eq!(kernel.sum(), 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_in_focus_kernel_peaks_at_center() {
        let pupil = test_pupil(&[]);
        let volume = PsfPropagator::new().propagate(&pupil, &[0.0]).unwrap();
        let kernel = &volume.kernels()[0];
        let (rows, cols) = kernel.dim();
        let peak = kernel
            .indexed_iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(peak, (rows / 2, cols / 2));
    }

    #[test]
    fn test_defocus_spreads_the_kernel() {
        let pupil = test_pupil(&[]);
        let volume = PsfPropagator::new().propagate(&pupil, &[0.0, 150.0]).unwrap();
        let peak_focused = volume.kernels()[0].iter().cloned().fold(0.0, f64::max);
        let peak_defocused = volume.kernels()[1].iter().cloned().fold(0.0, f64::max);
        assert!(peak_defocused < peak_focused);
    }

    #[test]
    fn test_depth_order_preserved() {
        let pupil = test_pupil(&[]);
        let depths = [80.0, -40.0, 0.0, 120.0];
        let volume = PsfPropagator::new().propagate(&pupil, &depths).unwrap();
        assert_eq!(volume.depths(), &depths);
        // Each depth computed independently: a singleton request matches
        // the corresponding stack slice exactly
        let single = PsfPropagator::new().propagate(&pupil, &[-40.0]).unwrap();
        assert_eq!(single.kernels()[0], volume.kernels()[1]);
    }

    #[test]
    fn test_misconfigured_na_fails_eagerly() {
        let spec = PupilSpec::new(
            1.4,
            530e-9,
            1e-6,
            10.0,
            OutputRegion::new(0, 0, 16, 16),
            Padding::uniform(8),
        )
        .unwrap()
        .with_medium_index(1.0)
        .unwrap();
        let pupil = Pupil::build(&spec, &[]);
        let err = PsfPropagator::new().propagate(&pupil, &[0.0]).unwrap_err();
        assert_eq!(
            err,
            PropagationError::DepthOutOfRange {
                na: 1.4,
                medium_index: 1.0
            }
        );
    }

    #[test]
    fn test_paraxial_close_to_exact_at_low_na() {
        let pupil = test_pupil(&[]);
        let exact = PsfPropagator::new().propagate(&pupil, &[30.0]).unwrap();
        let paraxial = PsfPropagator::with_model(DefocusModel::Paraxial)
            .propagate(&pupil, &[30.0])
            .unwrap();
        // NA/n ~ 0.23, so the expansion error is tiny
        for (a, b) in exact.kernels()[0].iter().zip(paraxial.kernels()[0].iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-3);
        }
    }
}
