use crate::{GrayImageView, PatternSpec, Pt2};

/// Result of running a pattern detector on one frame of one modality.
///
/// Either every corner was found, in order, or the frame is rejected
/// outright. There is no partially populated state: downstream
/// correspondence matching relies on both modalities carrying identically
/// ordered point sets.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternObservation {
    /// Ordered 2D corners, length = `PatternSpec::corner_count()`,
    /// row-major to match the generated object points.
    Found(Vec<Pt2>),
    /// Pattern not found in this frame.
    NotFound,
}

impl PatternObservation {
    pub fn is_found(&self) -> bool {
        matches!(self, PatternObservation::Found(_))
    }

    pub fn points(&self) -> Option<&[Pt2]> {
        match self {
            PatternObservation::Found(pts) => Some(pts),
            PatternObservation::NotFound => None,
        }
    }
}

/// A planar calibration pattern locator.
///
/// Implementations must be deterministic: the same image bytes and the same
/// geometry always yield the same observation, including point ordering.
pub trait PatternDetector {
    fn detect(&self, image: &GrayImageView<'_>, spec: &PatternSpec) -> PatternObservation;
}
