//! Common utilities for pupilsim integration tests

use ndarray::Array2;
use pupilsim::{OutputRegion, Padding, OpticalSystem, PupilSpec, ScattererMap};

/// Point scatterer placed at a position given in output-region pixels.
///
/// Stands in for the external scatterer collaborator: it places a single
/// delta of the requested intensity on the padded grid.
#[derive(Debug, Clone)]
pub struct PointParticle {
    pub row: usize,
    pub col: usize,
    pub intensity: f64,
}

impl PointParticle {
    pub fn new(row: usize, col: usize, intensity: f64) -> Self {
        Self {
            row,
            col,
            intensity,
        }
    }
}

impl ScattererMap for PointParticle {
    fn place(&self, region: &OutputRegion, padding: &Padding) -> Array2<f64> {
        let mut map = Array2::zeros(padding.padded_shape(region));
        map[[padding.top + self.row, padding.left + self.col]] = 1.0;
        map
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }
}

/// The fluorescence-microscope configuration shared by the aberration
/// tests: NA 0.3, 530 nm, 1 um camera pixels at 10x, 64x48 output with 64
/// pixels of padding per side.
pub fn fluorescence_spec() -> PupilSpec {
    PupilSpec::new(
        0.3,
        530e-9,
        1e-6,
        10.0,
        OutputRegion::new(0, 0, 64, 48),
        Padding::uniform(64),
    )
    .expect("reference configuration is valid")
}

/// Optical system over the reference configuration with no aberrations
pub fn fluorescence_optics() -> OpticalSystem {
    OpticalSystem::new(fluorescence_spec())
}
