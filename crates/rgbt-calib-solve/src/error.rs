use thiserror::Error;

/// Errors produced by the calibration solvers.
///
/// Every variant leaves the caller's state untouched; a failed solve simply
/// yields no parameters.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    /// Fewer usable views than the solver requires.
    #[error("need at least {need} views, got {got}")]
    NotEnoughViews { got: usize, need: usize },
    /// Plane homography estimation failed for a view.
    #[error("homography estimation failed for view {view}")]
    HomographyFailed { view: usize },
    /// SVD failed during a linear solve.
    #[error("svd failed during linear solve")]
    SvdFailed,
    /// Degenerate geometry (e.g. coplanar camera centers, no radial
    /// diversity, ill-conditioned Zhang system).
    #[error("degenerate configuration")]
    Degenerate,
    /// A camera matrix that must be inverted is singular.
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    /// Pose decomposition failed for a view.
    #[error("planar pose decomposition failed for view {view}")]
    PoseFailed { view: usize },
}
