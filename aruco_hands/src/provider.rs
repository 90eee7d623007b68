//! Feature-provider seams: hand landmarks and fiducial markers.
//!
//! Both are per-frame and stateless from the driver's point of view.
//! Implementors may keep internal state (model sessions, tracking) behind
//! `&mut self`.

use aruco_space::{HandDetection, MarkerDetection, ModelError};
use thiserror::Error;

use crate::frame::Frame;

/// `Setup` only comes out of constructors.  Everything else is a failure on
/// one frame, which the driver logs before carrying on as if nothing had
/// been detected.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot set up provider: {0}")]
    Setup(String),
    #[error("hand model inference failed: {0}")]
    Inference(String),
    #[error("marker detection failed: {0}")]
    Detection(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub trait HandFeatureProvider {
    /// Every hand visible in `frame`, pixel coordinates.  None is `Ok(vec![])`.
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandDetection>, ProviderError>;
}

pub trait MarkerFeatureProvider {
    /// Every marker visible in `frame`, corners in detector order.
    fn detect_markers(&mut self, frame: &Frame) -> Result<Vec<MarkerDetection>, ProviderError>;
}

impl<P: HandFeatureProvider + ?Sized> HandFeatureProvider for Box<P> {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandDetection>, ProviderError> {
        (**self).detect_hands(frame)
    }
}

impl<P: MarkerFeatureProvider + ?Sized> MarkerFeatureProvider for Box<P> {
    fn detect_markers(&mut self, frame: &Frame) -> Result<Vec<MarkerDetection>, ProviderError> {
        (**self).detect_markers(frame)
    }
}

/// Sees no hands, ever.  Used when no landmark model is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHands;

impl HandFeatureProvider for NoHands {
    fn detect_hands(&mut self, _frame: &Frame) -> Result<Vec<HandDetection>, ProviderError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hands_is_empty_not_an_error() {
        let mut p = NoHands;
        assert!(p.detect_hands(&Frame::filled(8, 8, 0)).unwrap().is_empty());
    }

    #[test]
    fn model_errors_convert() {
        let err: ProviderError = ModelError::LandmarkCount { expected: 21, found: 3 }.into();
        assert!(matches!(err, ProviderError::Model(_)));
    }
}
