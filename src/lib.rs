//! Wave-optics microscopy image simulation
//!
//! This crate simulates optical image formation for microscopy, producing
//! synthetic images of point-like or extended scatterers as they would
//! appear through a real imaging system, including lens aberrations. The
//! intended use is generating labeled, physically plausible training images
//! for image-analysis and ML tasks, with full control over the optical
//! parameters and the wavefront aberrations.
//!
//! # Pipeline
//!
//! Data flows strictly upward through five stages:
//!
//! 1. **Zernike basis** ([`zernike`]): orthonormal polynomials on the unit
//!    pupil disk, the single source of truth for all aberration shapes.
//! 2. **Aberrations** ([`aberration`]): named low-order aberrations, general
//!    Zernike sums, and Gaussian apodization, combined by phase addition and
//!    amplitude multiplication.
//! 3. **Pupil** ([`pupil`]): the complex pupil function sampled on a grid
//!    sized from the padded output region, with physical units (NA,
//!    wavelength, resolution, magnification) normalized to pupil
//!    coordinates.
//! 4. **Propagation** ([`propagate`]): a per-depth defocus phase applied to
//!    the pupil, inverse-Fourier-transformed into a real-space intensity
//!    kernel for each requested depth.
//! 5. **Image formation** ([`image_former`]): convolution of the scatterer
//!    map with each kernel and a crop to the requested output region; the
//!    padding border absorbs convolution edge effects.
//!
//! The [`pipeline`] module ties the stages together behind a named
//! [`compose`](pipeline::compose) operation and an optional provenance
//! wrapper that records the exact parameters used to produce an image.
//!
//! # Conventions
//!
//! - Lengths (wavelength, resolution) are in meters; `resolution` is the
//!   camera-pixel pitch, so the sample-plane pitch is
//!   `resolution / magnification`.
//! - Depths are in sample-plane pixel units and may be negative.
//! - Every PSF kernel is normalized so its sum over the padded grid equals
//!   one, so total scatterer intensity is preserved by convolution
//!   regardless of depth or aberration.

pub mod aberration;
pub mod fourier;
pub mod image_former;
pub mod pipeline;
pub mod propagate;
pub mod pupil;
pub mod region;
pub mod zernike;

// Re-exports for easier access
pub use aberration::{Aberration, AberrationError, NamedAberration};
pub use image_former::{form, FormError, FormedImage};
pub use pipeline::{
    compose, AnnotatedImage, ImagingPipeline, OpticalSystem, OpticsRecord, PipelineError,
    ScattererMap,
};
pub use propagate::{DefocusModel, PropagationError, PsfPropagator, PsfVolume};
pub use pupil::{Pupil, PupilError, PupilGrid, PupilSpec};
pub use region::{OutputRegion, Padding};
pub use zernike::{zernike, ZernikeError, ZernikeIndex};
