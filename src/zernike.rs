//! Zernike polynomial basis on the unit pupil disk.
//!
//! Zernike polynomials are the standard orthogonal basis for describing
//! optical aberrations over a circular aperture. Each mode is indexed by a
//! radial order `n >= 0` and an azimuthal frequency `m` with `|m| <= n` and
//! `n - |m|` even. This module evaluates individual modes in the
//! orthonormal convention over the unit disk:
//!
//! ```text
//! Z_n^m(rho, theta) = N_n^m * R_n^|m|(rho) * cos(|m| theta)   (m >= 0)
//! Z_n^m(rho, theta) = N_n^m * R_n^|m|(rho) * sin(|m| theta)   (m <  0)
//! ```
//!
//! with `N_n^m = sqrt(2(n+1))` for `m != 0` and `sqrt(n+1)` for `m = 0`,
//! and the radial polynomial given by the closed-form finite sum
//!
//! ```text
//! R_n^|m|(rho) = sum_{k=0}^{(n-|m|)/2} (-1)^k C(n-k, k)
//!                * C(n-2k, (n-|m|)/2 - k) * rho^(n-2k)
//! ```
//!
//! Points with `rho > 1` lie outside the aperture and evaluate to exactly
//! zero without touching the polynomial, since high-order terms amplify
//! numerical noise there.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for Zernike mode construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZernikeError {
    #[error("invalid Zernike indices n={n}, m={m}: require |m| <= n and n - |m| even")]
    InvalidIndex { n: u32, m: i32 },
}

/// A validated Zernike mode index pair.
///
/// Construction enforces the index rule once, so downstream evaluation is
/// infallible and hot loops never re-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZernikeIndex {
    n: u32,
    m: i32,
}

impl ZernikeIndex {
    /// Validate and create a mode index.
    ///
    /// Fails with [`ZernikeError::InvalidIndex`] when `|m| > n` or
    /// `n - |m|` is odd.
    pub fn new(n: u32, m: i32) -> Result<Self, ZernikeError> {
        let m_abs = m.unsigned_abs();
        if m_abs > n || (n - m_abs) % 2 != 0 {
            return Err(ZernikeError::InvalidIndex { n, m });
        }
        Ok(Self { n, m })
    }

    /// Radial order
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Azimuthal frequency (signed)
    pub fn m(&self) -> i32 {
        self.m
    }

    /// Orthonormal normalization factor over the unit disk
    pub fn normalization(&self) -> f64 {
        if self.m == 0 {
            ((self.n + 1) as f64).sqrt()
        } else {
            (2.0 * (self.n + 1) as f64).sqrt()
        }
    }

    /// Evaluate the normalized mode at polar pupil coordinates.
    ///
    /// Returns exactly `0.0` outside the aperture (`rho > 1`).
    pub fn evaluate(&self, rho: f64, theta: f64) -> f64 {
        if rho > 1.0 {
            return 0.0;
        }
        self.normalization() * radial(self.n, self.m, rho) * angular(self.m, theta)
    }
}

/// Binomial coefficient C(n, k) as f64.
///
/// Computed iteratively; exact for the small orders used by optical
/// aberrations (n well below 30).
fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Zernike radial polynomial `R_n^|m|(rho)`.
///
/// Assumes a valid index pair; use [`ZernikeIndex::new`] or [`zernike`] for
/// validated entry points. The sign of `m` is ignored.
pub fn radial(n: u32, m: i32, rho: f64) -> f64 {
    let m_abs = m.unsigned_abs();
    let half = (n - m_abs) / 2;
    let mut sum = 0.0;
    for k in 0..=half {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        let term = sign * binomial(n - k, k) * binomial(n - 2 * k, half - k);
        sum += term * rho.powi((n - 2 * k) as i32);
    }
    sum
}

/// Zernike angular factor: `cos(|m| theta)` for `m >= 0`, `sin(|m| theta)`
/// for `m < 0`.
pub fn angular(m: i32, theta: f64) -> f64 {
    let m_abs = m.unsigned_abs() as f64;
    if m >= 0 {
        (m_abs * theta).cos()
    } else {
        (m_abs * theta).sin()
    }
}

/// Evaluate the orthonormal Zernike mode `Z_n^m` at `(rho, theta)`.
///
/// Validates the index pair on every call; prefer [`ZernikeIndex`] when
/// evaluating a mode over a whole grid.
pub fn zernike(n: u32, m: i32, rho: f64, theta: f64) -> Result<f64, ZernikeError> {
    Ok(ZernikeIndex::new(n, m)?.evaluate(rho, theta))
}
