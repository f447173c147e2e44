//! Per-device intrinsic calibration pipeline.
//!
//! Linear initialization plus one refinement sweep:
//! 1. per-view DLT homographies from the raw (distorted) pixels,
//! 2. Zhang closed-form `K`,
//! 3. linear distortion fit against the homography residuals,
//! 4. re-estimate homographies and `K` from undistorted pixels, refit the
//!    distortion against the new `K`,
//! 5. report the reprojection RMS through the full model.

use log::{debug, info};
use rgbt_calib_core::{estimate_homography, Mat3, Pt2, Pt3, Real, Vec2};
use serde::{Deserialize, Serialize};

use crate::distortion::{fit_distortion, BrownConrady5, DistortionFitView};
use crate::error::SolveError;
use crate::planar_pose::pose_from_homography;
use crate::zhang::estimate_intrinsics_from_homographies;

/// One accepted view: planar board coordinates and the matching detected
/// pixels, in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationView {
    pub board_points: Vec<Pt2>,
    pub image_points: Vec<Pt2>,
}

/// Solved intrinsics for a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicCalibration {
    pub camera_matrix: Mat3,
    pub distortion: BrownConrady5,
    /// Root-mean-square reprojection error in pixels, over every point of
    /// every view.
    pub rms_error: Real,
}

fn view_homographies(
    views: &[CalibrationView],
    pixels: &[Vec<Pt2>],
) -> Result<Vec<Mat3>, SolveError> {
    views
        .iter()
        .zip(pixels)
        .enumerate()
        .map(|(i, (view, px))| {
            estimate_homography(&view.board_points, px)
                .map(|h| h.h)
                .ok_or(SolveError::HomographyFailed { view: i })
        })
        .collect()
}

/// Reprojection RMS through pose, distortion, and `K`.
fn reprojection_rms(
    views: &[CalibrationView],
    homographies: &[Mat3],
    k: &Mat3,
    dist: &BrownConrady5,
) -> Result<Real, SolveError> {
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for (i, (view, h)) in views.iter().zip(homographies).enumerate() {
        let pose = pose_from_homography(k, h).map_err(|_| SolveError::PoseFailed { view: i })?;
        for (board_pt, obs) in view.board_points.iter().zip(&view.image_points) {
            let cam = pose * Pt3::new(board_pt.x, board_pt.y, 0.0);
            if cam.z <= Real::EPSILON {
                return Err(SolveError::PoseFailed { view: i });
            }
            let n = dist.distort(&Vec2::new(cam.x / cam.z, cam.y / cam.z));
            let u = k[(0, 0)] * n.x + k[(0, 1)] * n.y + k[(0, 2)];
            let v = k[(1, 1)] * n.y + k[(1, 2)];
            sum_sq += (u - obs.x).powi(2) + (v - obs.y).powi(2);
            count += 1;
        }
    }
    if count == 0 {
        return Err(SolveError::Degenerate);
    }
    Ok((sum_sq / count as Real).sqrt())
}

/// Calibrate one device from its accepted views.
pub fn calibrate_intrinsics(
    views: &[CalibrationView],
    min_views: usize,
) -> Result<IntrinsicCalibration, SolveError> {
    let need = min_views.max(2);
    if views.len() < need {
        return Err(SolveError::NotEnoughViews {
            got: views.len(),
            need,
        });
    }

    // Initialization from the raw pixels.
    let raw_pixels: Vec<Vec<Pt2>> = views.iter().map(|v| v.image_points.clone()).collect();
    let hs = view_homographies(views, &raw_pixels)?;
    let k0 = estimate_intrinsics_from_homographies(&hs)?.k_matrix();
    debug!(
        "intrinsics init: fx={:.1} fy={:.1} cx={:.1} cy={:.1}",
        k0[(0, 0)],
        k0[(1, 1)],
        k0[(0, 2)],
        k0[(1, 2)]
    );

    let fit_views: Vec<DistortionFitView<'_>> = views
        .iter()
        .zip(&hs)
        .map(|(view, h)| DistortionFitView {
            homography: *h,
            board_points: &view.board_points,
            pixel_points: &view.image_points,
        })
        .collect();
    let dist0 = match fit_distortion(&k0, &fit_views) {
        Ok(d) => d,
        // A perfectly centered synthetic target carries no distortion
        // signal; proceed with the undistorted model.
        Err(SolveError::Degenerate) => BrownConrady5::default(),
        Err(e) => return Err(e),
    };

    // One refinement sweep: undo the estimated distortion and redo the
    // linear stages on the corrected pixels.
    let undistorted: Vec<Vec<Pt2>> = views
        .iter()
        .enumerate()
        .map(|(i, view)| {
            crate::distortion::undistort_pixels(&k0, &dist0, &view.image_points)
                .ok_or(SolveError::PoseFailed { view: i })
        })
        .collect::<Result<_, _>>()?;
    let hs_refined = view_homographies(views, &undistorted)?;
    let k = estimate_intrinsics_from_homographies(&hs_refined)?.k_matrix();

    let refit_views: Vec<DistortionFitView<'_>> = views
        .iter()
        .zip(&hs_refined)
        .map(|(view, h)| DistortionFitView {
            homography: *h,
            board_points: &view.board_points,
            pixel_points: &view.image_points,
        })
        .collect();
    let dist = match fit_distortion(&k, &refit_views) {
        Ok(d) => d,
        Err(SolveError::Degenerate) => BrownConrady5::default(),
        Err(e) => return Err(e),
    };

    let rms_error = reprojection_rms(views, &hs_refined, &k, &dist)?;
    info!(
        "intrinsics: {} views, rms {:.4} px, fx={:.1} fy={:.1}",
        views.len(),
        rms_error,
        k[(0, 0)],
        k[(1, 1)]
    );

    Ok(IntrinsicCalibration {
        camera_matrix: k,
        distortion: dist,
        rms_error,
    })
}
