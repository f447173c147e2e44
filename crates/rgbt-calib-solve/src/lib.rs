//! Numerical estimation for the RGB-thermal calibration engine.
//!
//! This crate holds everything that actually solves for parameters:
//! - Zhang closed-form intrinsics from plane homographies,
//! - linear Brown-Conrady distortion fitting from homography residuals,
//! - planar pose decomposition (`H = K [r1 r2 t]`),
//! - the intrinsic calibration pipeline ([`calibrate_intrinsics`]),
//! - the stereo calibration pipeline ([`calibrate_stereo`]).
//!
//! All solvers are single-pass in the sense of the engine's contract: a
//! linear initialization plus one refinement sweep, no bundle adjustment.

mod distortion;
mod error;
mod intrinsics;
mod planar_pose;
mod stereo;
mod zhang;

pub use distortion::{fit_distortion, undistort_pixels, BrownConrady5, DistortionFitView};
pub use error::SolveError;
pub use intrinsics::{calibrate_intrinsics, CalibrationView, IntrinsicCalibration};
pub use planar_pose::pose_from_homography;
pub use stereo::{calibrate_stereo, StereoCalibration, StereoView};
pub use zhang::{estimate_intrinsics_from_homographies, CameraIntrinsics};
