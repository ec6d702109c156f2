//! Pupil specification, normalized pupil grid, and the complex pupil
//! function.
//!
//! The pupil function lives at the lens back focal plane: a complex-valued
//! map over the aperture describing wavefront amplitude and phase. Its grid
//! is sized from the padded output region, and physical units are folded
//! into a single normalization: the pupil cutoff radius in frequency pixels
//! is `extent * pixel_pitch * NA / wavelength`, with the sample-plane pixel
//! pitch `resolution / magnification`. The normalized radius `rho` is 1 at
//! that cutoff, and points with `rho > 1` carry zero amplitude.

use crate::aberration::Aberration;
use crate::region::{OutputRegion, Padding};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for pupil specification validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PupilError {
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },
    #[error("output region must be non-empty, got {rows}x{cols}")]
    EmptyRegion { rows: usize, cols: usize },
}

/// Immutable optical configuration for one simulated imaging system.
///
/// Constructed once per configuration and shared read-only by the pupil
/// builder, the propagator, and the provenance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PupilSpec {
    /// Numerical aperture of the objective
    pub na: f64,
    /// Illumination wavelength in meters
    pub wavelength: f64,
    /// Camera pixel pitch in meters
    pub resolution: f64,
    /// Optical magnification
    pub magnification: f64,
    /// Refractive index of the immersion medium
    pub refractive_index_medium: f64,
    /// Requested output extent
    pub output_region: OutputRegion,
    /// Border absorbed around the output region
    pub padding: Padding,
}

impl PupilSpec {
    /// Validate and create an optical configuration.
    ///
    /// The immersion medium defaults to water (n = 1.33); override with
    /// [`with_medium_index`](Self::with_medium_index).
    pub fn new(
        na: f64,
        wavelength: f64,
        resolution: f64,
        magnification: f64,
        output_region: OutputRegion,
        padding: Padding,
    ) -> Result<Self, PupilError> {
        for (name, value) in [
            ("numerical aperture", na),
            ("wavelength", wavelength),
            ("resolution", resolution),
            ("magnification", magnification),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(PupilError::NonPositiveParameter { name, value });
            }
        }
        if output_region.height == 0 || output_region.width == 0 {
            return Err(PupilError::EmptyRegion {
                rows: output_region.height,
                cols: output_region.width,
            });
        }
        Ok(Self {
            na,
            wavelength,
            resolution,
            magnification,
            refractive_index_medium: 1.33,
            output_region,
            padding,
        })
    }

    /// New configuration with a different immersion medium index
    pub fn with_medium_index(&self, refractive_index_medium: f64) -> Result<Self, PupilError> {
        if refractive_index_medium <= 0.0 || !refractive_index_medium.is_finite() {
            return Err(PupilError::NonPositiveParameter {
                name: "medium refractive index",
                value: refractive_index_medium,
            });
        }
        Ok(Self {
            refractive_index_medium,
            ..self.clone()
        })
    }

    /// Pixel pitch in the sample plane, in meters
    pub fn sample_pixel_pitch(&self) -> f64 {
        self.resolution / self.magnification
    }

    /// Shape of the padded simulation grid as (rows, cols)
    pub fn grid_shape(&self) -> (usize, usize) {
        self.padding.padded_shape(&self.output_region)
    }

    /// Pupil cutoff radius in frequency pixels along one axis of extent
    /// `extent`.
    ///
    /// The cutoff spatial frequency is `NA / wavelength`; the frequency
    /// spacing of an `extent`-pixel DFT with the sample pitch is
    /// `1 / (extent * pitch)`, so the cutoff sits at
    /// `extent * pitch * NA / wavelength` pixels from the grid center.
    pub fn cutoff_radius_pixels(&self, extent: usize) -> f64 {
        extent as f64 * self.sample_pixel_pitch() * self.na / self.wavelength
    }
}

/// Normalized pupil coordinates, derived once per specification.
///
/// `rho` is the radial coordinate normalized to 1 at the pupil cutoff;
/// `theta` is the azimuth. Both are reused for every aberration term and
/// every depth, and are never mutated after construction.
#[derive(Debug, Clone)]
pub struct PupilGrid {
    pub rho: Array2<f64>,
    pub theta: Array2<f64>,
}

impl PupilGrid {
    /// Compute the grid for a specification's padded shape.
    pub fn from_spec(spec: &PupilSpec) -> Self {
        let (rows, cols) = spec.grid_shape();
        let radius_rows = spec.cutoff_radius_pixels(rows);
        let radius_cols = spec.cutoff_radius_pixels(cols);

        let mut rho = Array2::zeros((rows, cols));
        let mut theta = Array2::zeros((rows, cols));
        for r in 0..rows {
            let x = (r as f64 - (rows / 2) as f64) / radius_rows;
            for c in 0..cols {
                let y = (c as f64 - (cols / 2) as f64) / radius_cols;
                rho[[r, c]] = (x * x + y * y).sqrt();
                theta[[r, c]] = y.atan2(x);
            }
        }
        Self { rho, theta }
    }

    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.rho.dim()
    }
}

/// Complex pupil function for one specification + aberration set.
///
/// Immutable once built; shared read-only by the propagator across all
/// requested depths.
#[derive(Debug, Clone)]
pub struct Pupil {
    values: Array2<Complex64>,
    grid: PupilGrid,
    spec: PupilSpec,
}

impl Pupil {
    /// Build the complex pupil from a specification and aberration terms.
    ///
    /// Amplitude starts as the uniform aperture disk (1 inside, 0 outside),
    /// apodization terms multiply into it, and all phase terms add before
    /// exponentiation. Deterministic and side-effect-free: the same inputs
    /// always produce the same pupil.
    pub fn build(spec: &PupilSpec, terms: &[Aberration]) -> Self {
        let grid = PupilGrid::from_spec(spec);
        let shape = grid.shape();

        let mut phase = Array2::zeros(shape);
        let mut amplitude = grid.rho.mapv(|rho| if rho <= 1.0 { 1.0 } else { 0.0 });
        for term in terms {
            term.accumulate(&grid, &mut phase, &mut amplitude);
        }

        let mut values = Array2::from_elem(shape, Complex64::new(0.0, 0.0));
        for ((v, &amp), &ph) in values
            .iter_mut()
            .zip(amplitude.iter())
            .zip(phase.iter())
        {
            *v = Complex64::from_polar(amp, ph);
        }
        // from_polar(0, ph) is exactly zero, so the outside stays dark
        log::debug!(
            "built {}x{} pupil, {} aberration terms",
            shape.0,
            shape.1,
            terms.len()
        );

        Self {
            values,
            grid,
            spec: spec.clone(),
        }
    }

    /// Complex pupil samples on the padded grid, centered layout
    pub fn values(&self) -> &Array2<Complex64> {
        &self.values
    }

    /// The normalized coordinate grid this pupil was evaluated on
    pub fn grid(&self) -> &PupilGrid {
        &self.grid
    }

    /// The specification this pupil was built from
    pub fn spec(&self) -> &PupilSpec {
        &self.spec
    }
}
