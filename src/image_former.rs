//! Convolution of scatterer maps with PSF kernels and cropping to the
//! output region.
//!
//! The scatterer map arrives already placed on the padded grid by the
//! scatterer collaborator. Each PSF kernel is applied by Fourier-domain
//! convolution on that grid; the padding border absorbs the wrap-around of
//! the circular transform, so within the cropped output region the result
//! matches linear convolution. The crop discards the border and returns
//! exactly the requested output-region shape with a trailing channel axis.

use crate::fourier::{ifftshift, Fft2d};
use crate::propagate::PsfVolume;
use crate::region::{OutputRegion, Padding};
use ndarray::{s, Array2, Array3};
use num_complex::Complex64;
use thiserror::Error;

/// Error types for image formation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("output region {region_rows}x{region_cols} plus padding needs a {expected_rows}x{expected_cols} map, got {map_rows}x{map_cols}")]
    RegionOutOfBounds {
        region_rows: usize,
        region_cols: usize,
        expected_rows: usize,
        expected_cols: usize,
        map_rows: usize,
        map_cols: usize,
    },
    #[error("PSF volume grid is {volume_rows}x{volume_cols} but the scatterer map is {map_rows}x{map_cols}")]
    GridMismatch {
        volume_rows: usize,
        volume_cols: usize,
        map_rows: usize,
        map_cols: usize,
    },
}

/// One formed image: the cropped intensity array plus the depth it was
/// resolved at.
///
/// `data` has shape (height, width, 1); the trailing axis is the channel
/// dimension expected by downstream training pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct FormedImage {
    pub data: Array3<f64>,
    pub depth: f64,
}

/// Convolve a scatterer map with every kernel of a PSF volume and crop each
/// result to the output region.
///
/// Returns one [`FormedImage`] per depth, in the volume's depth order.
/// Fails eagerly, before any transform, when the map does not span the
/// padded grid implied by `region` + `padding`, or when the volume was
/// computed on a different grid.
pub fn form(
    scatterer_map: &Array2<f64>,
    psf_volume: &PsfVolume,
    region: &OutputRegion,
    padding: &Padding,
) -> Result<Vec<FormedImage>, FormError> {
    let (map_rows, map_cols) = scatterer_map.dim();
    let (expected_rows, expected_cols) = padding.padded_shape(region);
    if (map_rows, map_cols) != (expected_rows, expected_cols) {
        return Err(FormError::RegionOutOfBounds {
            region_rows: region.height,
            region_cols: region.width,
            expected_rows,
            expected_cols,
            map_rows,
            map_cols,
        });
    }
    let (volume_rows, volume_cols) = psf_volume.grid_shape();
    if (volume_rows, volume_cols) != (map_rows, map_cols) {
        return Err(FormError::GridMismatch {
            volume_rows,
            volume_cols,
            map_rows,
            map_cols,
        });
    }

    let fft = Fft2d::new(map_rows, map_cols);
    let map_spectrum = fft.forward(&scatterer_map.mapv(|v| Complex64::new(v, 0.0)));

    let mut images = Vec::with_capacity(psf_volume.len());
    for (depth, kernel) in psf_volume.iter() {
        // Centered kernel back to DFT layout so convolution keeps positions
        let kernel_spectrum =
            fft.forward(&ifftshift(&kernel.mapv(|v| Complex64::new(v, 0.0))));
        let product = &map_spectrum * &kernel_spectrum;
        let convolved = fft.inverse(&product).mapv(|v| v.re);

        let cropped = convolved.slice(s![
            padding.top..padding.top + region.height,
            padding.left..padding.left + region.width
        ]);
        let data = cropped
            .to_owned()
            .into_shape_with_order((region.height, region.width, 1))
            .expect("crop matches the output region shape");
        images.push(FormedImage { data, depth });
    }
    Ok(images)
}
