//! Composition of a scatterer source with an optical system, and the
//! provenance wrapper for resolved images.
//!
//! The numeric core stays pure: [`ImagingPipeline::resolve`] returns plain
//! arrays. Callers who want provenance use
//! [`resolve_annotated`](ImagingPipeline::resolve_annotated), which pairs
//! every array with an immutable [`OpticsRecord`] of the exact parameters
//! that produced it. The core never branches on that choice; annotation is
//! a wrapping decision made at the call site.
//!
//! Composition is an explicit named operation ([`compose`]) taking a
//! scatterer-producing component and an optics-producing component and
//! returning a resolvable pipeline.

use crate::aberration::Aberration;
use crate::image_former::{form, FormError};
use crate::propagate::{DefocusModel, PropagationError, PsfPropagator};
use crate::pupil::{Pupil, PupilSpec};
use crate::region::{OutputRegion, Padding};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for pipeline resolution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error(transparent)]
    Formation(#[from] FormError),
}

/// Interface boundary for the external scatterer collaborator.
///
/// Implementations place an intensity distribution on the padded pixel
/// grid's coordinate system. The core never creates or positions
/// scatterers; it only consumes the map and the overall intensity factor.
pub trait ScattererMap {
    /// Intensity distribution on the padded grid implied by
    /// `region` + `padding`, in that grid's coordinate system.
    fn place(&self, region: &OutputRegion, padding: &Padding) -> Array2<f64>;

    /// Overall intensity factor applied to the placed map
    fn intensity(&self) -> f64 {
        1.0
    }
}

/// Optics-producing component: the optical configuration plus its
/// aberration terms and defocus model.
#[derive(Debug, Clone)]
pub struct OpticalSystem {
    spec: PupilSpec,
    terms: Vec<Aberration>,
    defocus_model: DefocusModel,
}

impl OpticalSystem {
    /// Optical system with no aberrations
    pub fn new(spec: PupilSpec) -> Self {
        Self {
            spec,
            terms: Vec::new(),
            defocus_model: DefocusModel::Exact,
        }
    }

    /// Attach an aberration term; terms combine by phase addition
    /// (amplitude multiplication for apodization)
    pub fn with_aberration(mut self, term: Aberration) -> Self {
        self.terms.push(term);
        self
    }

    /// Select the defocus phase model
    pub fn with_defocus_model(mut self, model: DefocusModel) -> Self {
        self.defocus_model = model;
        self
    }

    /// The optical configuration
    pub fn spec(&self) -> &PupilSpec {
        &self.spec
    }

    /// Attached aberration terms
    pub fn terms(&self) -> &[Aberration] {
        &self.terms
    }
}

/// Compose a scatterer source with an optical system into a resolvable
/// pipeline.
///
/// The pupil is built once here (it depends only on the specification and
/// the aberration set); each `resolve` call then propagates to the
/// requested depths and forms images.
pub fn compose<S: ScattererMap>(scatterer: S, optics: OpticalSystem) -> ImagingPipeline<S> {
    let pupil = Pupil::build(&optics.spec, &optics.terms);
    log::debug!(
        "composed pipeline: {} aberration terms, grid {:?}",
        optics.terms.len(),
        optics.spec.grid_shape()
    );
    ImagingPipeline {
        scatterer,
        optics,
        pupil,
    }
}

/// A scatterer/optics pair ready to resolve at arbitrary depths.
#[derive(Debug, Clone)]
pub struct ImagingPipeline<S: ScattererMap> {
    scatterer: S,
    optics: OpticalSystem,
    pupil: Pupil,
}

impl<S: ScattererMap> ImagingPipeline<S> {
    /// Resolve the pipeline at the given depths.
    ///
    /// Returns one plain array of shape (height, width, 1) per depth, in
    /// the requested order.
    pub fn resolve(&self, depths: &[f64]) -> Result<Vec<Array3<f64>>, PipelineError> {
        Ok(self.resolve_images(depths)?.into_iter().map(|i| i.data).collect())
    }

    /// Resolve and wrap every image with the exact parameter set used.
    pub fn resolve_annotated(&self, depths: &[f64]) -> Result<Vec<AnnotatedImage>, PipelineError> {
        let images = self.resolve_images(depths)?;
        Ok(images
            .into_iter()
            .map(|image| AnnotatedImage {
                record: OpticsRecord::new(&self.optics, image.depth),
                data: image.data,
            })
            .collect())
    }

    fn resolve_images(
        &self,
        depths: &[f64],
    ) -> Result<Vec<crate::image_former::FormedImage>, PipelineError> {
        let spec = &self.optics.spec;
        let propagator = PsfPropagator::with_model(self.optics.defocus_model);
        let volume = propagator.propagate(&self.pupil, depths)?;

        let mut map = self.scatterer.place(&spec.output_region, &spec.padding);
        let intensity = self.scatterer.intensity();
        if intensity != 1.0 {
            map.mapv_inplace(|v| v * intensity);
        }

        Ok(form(&map, &volume, &spec.output_region, &spec.padding)?)
    }
}

/// Immutable record of the parameters that produced an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsRecord {
    pub na: f64,
    pub wavelength: f64,
    pub resolution: f64,
    pub magnification: f64,
    pub refractive_index_medium: f64,
    pub output_region: OutputRegion,
    pub padding: Padding,
    pub aberrations: Vec<Aberration>,
    pub depth: f64,
}

impl OpticsRecord {
    fn new(optics: &OpticalSystem, depth: f64) -> Self {
        let spec = &optics.spec;
        Self {
            na: spec.na,
            wavelength: spec.wavelength,
            resolution: spec.resolution,
            magnification: spec.magnification,
            refractive_index_medium: spec.refractive_index_medium,
            output_region: spec.output_region,
            padding: spec.padding,
            aberrations: optics.terms.clone(),
            depth,
        }
    }
}

/// An image paired with the provenance record of its production.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    pub data: Array3<f64>,
    pub record: OpticsRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aberration::NamedAberration;

    struct CenterPoint;

    impl ScattererMap for CenterPoint {
        fn place(&self, region: &OutputRegion, padding: &Padding) -> Array2<f64> {
            let mut map = Array2::zeros(padding.padded_shape(region));
            map[[padding.top + region.height / 2, padding.left + region.width / 2]] = 1.0;
            map
        }
    }

    fn test_optics() -> OpticalSystem {
        let spec = PupilSpec::new(
            0.3,
            530e-9,
            1e-6,
            10.0,
            OutputRegion::new(0, 0, 32, 24),
            Padding::uniform(32),
        )
        .unwrap();
        OpticalSystem::new(spec)
    }

    #[test]
    fn test_resolve_returns_plain_arrays() {
        let pipeline = compose(CenterPoint, test_optics());
        let images = pipeline.resolve(&[-100.0, 0.0, 100.0]).unwrap();
        assert_eq!(images.len(), 3);
        for image in &images {
            assert_eq!(image.dim(), (32, 24, 1));
        }
    }

    #[test]
    fn test_annotated_resolve_carries_parameters() {
        let optics = test_optics()
            .with_aberration(Aberration::named(NamedAberration::Astigmatism, 0.6));
        let pipeline = compose(CenterPoint, optics);
        let annotated = pipeline.resolve_annotated(&[50.0]).unwrap();
        assert_eq!(annotated.len(), 1);
        let record = &annotated[0].record;
        assert_eq!(record.depth, 50.0);
        assert_eq!(record.na, 0.3);
        assert_eq!(record.wavelength, 530e-9);
        assert_eq!(record.magnification, 10.0);
        assert_eq!(
            record.aberrations,
            vec![Aberration::named(NamedAberration::Astigmatism, 0.6)]
        );
    }

    #[test]
    fn test_annotated_matches_plain_data() {
        // Annotation is a wrapper decision: the numeric result is identical
        let pipeline = compose(CenterPoint, test_optics());
        let plain = pipeline.resolve(&[25.0]).unwrap();
        let annotated = pipeline.resolve_annotated(&[25.0]).unwrap();
        assert_eq!(plain[0], annotated[0].data);
    }

    #[test]
    fn test_record_serializes() {
        let optics = test_optics()
            .with_aberration(Aberration::zernike(&[2, 3], &[0, 1], &[0.5, 0.3]).unwrap());
        let pipeline = compose(CenterPoint, optics);
        let annotated = pipeline.resolve_annotated(&[0.0]).unwrap();
        let json = serde_json::to_string(&annotated[0].record);
        assert!(json.is_ok());
    }
}
