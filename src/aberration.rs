//! Pupil-plane aberration terms.
//!
//! An aberration term contributes either phase or amplitude to the complex
//! pupil function. Named low-order aberrations are fixed Zernike modes with
//! a single user coefficient, resolved through a lookup table so every term
//! flows through the same general evaluation path. A general term takes
//! parallel `n`/`m`/`coefficient` sequences. Gaussian apodization windows
//! the pupil *amplitude* instead of its phase.
//!
//! Composition rule: phases of all terms add before exponentiation;
//! apodization multiplies amplitude; both combine multiplicatively into the
//! final complex pupil value.

use crate::pupil::PupilGrid;
use crate::zernike::{ZernikeError, ZernikeIndex};
use ndarray::Array2;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error types for aberration construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AberrationError {
    #[error("mismatched sequence lengths: {n_len} radial, {m_len} azimuthal, {coefficient_len} coefficients")]
    ShapeMismatch {
        n_len: usize,
        m_len: usize,
        coefficient_len: usize,
    },
    #[error(transparent)]
    InvalidIndex(#[from] ZernikeError),
    #[error("apodization sigma must be positive, got {0}")]
    NonPositiveSigma(f64),
}

/// Named low-order aberrations.
///
/// Each maps to a single Zernike mode; the coefficient supplied with the
/// name weights that mode. Piston is a constant phase offset and has no
/// visible effect on intensity images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedAberration {
    Piston,
    VerticalTilt,
    HorizontalTilt,
    ObliqueAstigmatism,
    Defocus,
    Astigmatism,
    ObliqueTrefoil,
    VerticalComa,
    HorizontalComa,
    Trefoil,
    SphericalAberration,
}

/// Lookup table name -> Zernike mode, the single source of truth for the
/// named aberrations.
static MODE_TABLE: Lazy<HashMap<NamedAberration, ZernikeIndex>> = Lazy::new(|| {
    use NamedAberration::*;
    let modes = [
        (Piston, (0, 0)),
        (VerticalTilt, (1, -1)),
        (HorizontalTilt, (1, 1)),
        (ObliqueAstigmatism, (2, -2)),
        (Defocus, (2, 0)),
        (Astigmatism, (2, 2)),
        (ObliqueTrefoil, (3, -3)),
        (VerticalComa, (3, -1)),
        (HorizontalComa, (3, 1)),
        (Trefoil, (3, 3)),
        (SphericalAberration, (4, 0)),
    ];
    modes
        .into_iter()
        .map(|(name, (n, m))| {
            let index = ZernikeIndex::new(n, m).expect("mode table entries are valid");
            (name, index)
        })
        .collect()
});

impl NamedAberration {
    /// The Zernike mode this name stands for
    pub fn mode(&self) -> ZernikeIndex {
        MODE_TABLE[self]
    }
}

/// A single aberration term attached to an optical configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aberration {
    /// Named mode with one real coefficient
    Named {
        kind: NamedAberration,
        coefficient: f64,
    },
    /// Weighted sum of general Zernike modes
    Zernike {
        modes: Vec<ZernikeIndex>,
        coefficients: Vec<f64>,
    },
    /// Gaussian amplitude window, sigma in normalized pupil-radius units
    GaussianApodization { sigma: f64 },
}

impl Aberration {
    /// Named aberration with a single coefficient
    pub fn named(kind: NamedAberration, coefficient: f64) -> Self {
        Self::Named { kind, coefficient }
    }

    /// General Zernike aberration from parallel index/coefficient sequences.
    ///
    /// Fails with [`AberrationError::ShapeMismatch`] when the sequences
    /// differ in length, and with an index error when any (n, m) pair
    /// violates the Zernike parity/range rule.
    pub fn zernike(n: &[u32], m: &[i32], coefficients: &[f64]) -> Result<Self, AberrationError> {
        if n.len() != m.len() || n.len() != coefficients.len() {
            return Err(AberrationError::ShapeMismatch {
                n_len: n.len(),
                m_len: m.len(),
                coefficient_len: coefficients.len(),
            });
        }
        let modes = n
            .iter()
            .zip(m.iter())
            .map(|(&n, &m)| ZernikeIndex::new(n, m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Zernike {
            modes,
            coefficients: coefficients.to_vec(),
        })
    }

    /// Gaussian apodization window
    pub fn gaussian_apodization(sigma: f64) -> Result<Self, AberrationError> {
        if sigma <= 0.0 {
            return Err(AberrationError::NonPositiveSigma(sigma));
        }
        Ok(Self::GaussianApodization { sigma })
    }

    /// Fold this term into the accumulated pupil phase and amplitude.
    ///
    /// Phase terms add into `phase`; apodization multiplies into
    /// `amplitude`. Points outside the aperture are untouched (they carry
    /// zero amplitude already).
    pub(crate) fn accumulate(
        &self,
        grid: &PupilGrid,
        phase: &mut Array2<f64>,
        amplitude: &mut Array2<f64>,
    ) {
        match self {
            Self::Named { kind, coefficient } => {
                add_mode(grid, kind.mode(), *coefficient, phase);
            }
            Self::Zernike {
                modes,
                coefficients,
            } => {
                for (mode, &coefficient) in modes.iter().zip(coefficients.iter()) {
                    add_mode(grid, *mode, coefficient, phase);
                }
            }
            Self::GaussianApodization { sigma } => {
                let denom = 2.0 * sigma * sigma;
                for (amp, &rho) in amplitude.iter_mut().zip(grid.rho.iter()) {
                    if rho <= 1.0 {
                        *amp *= (-rho * rho / denom).exp();
                    }
                }
            }
        }
    }
}

fn add_mode(grid: &PupilGrid, mode: ZernikeIndex, coefficient: f64, phase: &mut Array2<f64>) {
    for ((p, &rho), &theta) in phase.iter_mut().zip(grid.rho.iter()).zip(grid.theta.iter()) {
        *p += coefficient * mode.evaluate(rho, theta);
    }
}
