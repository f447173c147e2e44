//! Stereo (extrinsic) calibration between the RGB and thermal devices.
//!
//! Each view where both devices saw the board yields two planar poses and
//! therefore one sample of the relative transform. The samples are averaged
//! (quaternion mean for rotation, arithmetic mean for translation) and the
//! essential and fundamental matrices are derived from the result.
//!
//! Convention: the solved transform maps thermal-camera coordinates into
//! RGB-camera coordinates, `x_rgb = R * x_th + t`.

use log::info;
use nalgebra::{Quaternion, UnitQuaternion, Vector4};
use rgbt_calib_core::{estimate_homography, Iso3, Mat3, Pt2, Pt3, Real, Vec3};
use serde::{Deserialize, Serialize};

use crate::distortion::undistort_pixels;
use crate::error::SolveError;
use crate::intrinsics::IntrinsicCalibration;
use crate::planar_pose::pose_from_homography;

/// One view where both devices detected the full pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoView {
    pub board_points: Vec<Pt2>,
    pub rgb_points: Vec<Pt2>,
    pub thermal_points: Vec<Pt2>,
}

/// Solved relative geometry of the camera pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    /// Rotation taking thermal-camera coordinates to RGB-camera coordinates.
    pub rotation: Mat3,
    /// Translation of the same transform, in board units.
    pub translation: Vec3,
    pub essential: Mat3,
    pub fundamental: Mat3,
    /// RMS distance in undistorted RGB pixels between observed corners and
    /// corners predicted through the thermal pose and the relative transform.
    pub rms_error: Real,
}

fn skew_symmetric(t: &Vec3) -> Mat3 {
    Mat3::new(0.0, -t.z, t.y, t.z, 0.0, -t.x, -t.y, t.x, 0.0)
}

fn plane_pose(
    k: &Mat3,
    board: &[Pt2],
    pixels: &[Pt2],
    view: usize,
) -> Result<Iso3, SolveError> {
    let h = estimate_homography(board, pixels)
        .ok_or(SolveError::HomographyFailed { view })?;
    pose_from_homography(k, &h.h).map_err(|_| SolveError::PoseFailed { view })
}

/// Hemisphere-corrected quaternion mean.
fn average_rotation(poses: &[Iso3]) -> Result<UnitQuaternion<Real>, SolveError> {
    let first = poses[0].rotation.into_inner().coords;
    let mut sum = Vector4::<Real>::zeros();
    for pose in poses {
        let mut q = pose.rotation.into_inner().coords;
        if q.dot(&first) < 0.0 {
            q = -q;
        }
        sum += q;
    }
    if sum.norm() < Real::EPSILON {
        return Err(SolveError::Degenerate);
    }
    Ok(UnitQuaternion::from_quaternion(Quaternion::from(sum)))
}

/// Solve the RGB-from-thermal transform from views seen by both devices.
pub fn calibrate_stereo(
    views: &[StereoView],
    rgb: &IntrinsicCalibration,
    thermal: &IntrinsicCalibration,
    min_views: usize,
) -> Result<StereoCalibration, SolveError> {
    let need = min_views.max(1);
    if views.len() < need {
        return Err(SolveError::NotEnoughViews {
            got: views.len(),
            need,
        });
    }

    let k_rgb = rgb.camera_matrix;
    let k_th = thermal.camera_matrix;

    let mut relatives = Vec::with_capacity(views.len());
    let mut rgb_undist = Vec::with_capacity(views.len());
    let mut th_poses = Vec::with_capacity(views.len());
    for (i, view) in views.iter().enumerate() {
        let rgb_px = undistort_pixels(&k_rgb, &rgb.distortion, &view.rgb_points)
            .ok_or(SolveError::SingularIntrinsics)?;
        let th_px = undistort_pixels(&k_th, &thermal.distortion, &view.thermal_points)
            .ok_or(SolveError::SingularIntrinsics)?;

        let pose_rgb = plane_pose(&k_rgb, &view.board_points, &rgb_px, i)?;
        let pose_th = plane_pose(&k_th, &view.board_points, &th_px, i)?;

        relatives.push(pose_rgb * pose_th.inverse());
        rgb_undist.push(rgb_px);
        th_poses.push(pose_th);
    }

    let rotation_q = average_rotation(&relatives)?;
    let translation = relatives
        .iter()
        .fold(Vec3::zeros(), |acc, x| acc + x.translation.vector)
        / relatives.len() as Real;
    let rotation = *rotation_q.to_rotation_matrix().matrix();

    let essential = skew_symmetric(&translation) * rotation;
    let k_rgb_inv_t = k_rgb
        .try_inverse()
        .ok_or(SolveError::SingularIntrinsics)?
        .transpose();
    let k_th_inv = k_th.try_inverse().ok_or(SolveError::SingularIntrinsics)?;
    let fundamental = k_rgb_inv_t * essential * k_th_inv;

    // RMS: push every board corner through the thermal pose and the averaged
    // relative transform, project into undistorted RGB pixels.
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for ((view, pose_th), rgb_px) in views.iter().zip(&th_poses).zip(&rgb_undist) {
        for (board_pt, obs) in view.board_points.iter().zip(rgb_px) {
            let x_th = pose_th * Pt3::new(board_pt.x, board_pt.y, 0.0);
            let x_rgb = rotation * x_th.coords + translation;
            if x_rgb.z <= Real::EPSILON {
                return Err(SolveError::Degenerate);
            }
            let p = k_rgb * (x_rgb / x_rgb.z);
            sum_sq += (p.x - obs.x).powi(2) + (p.y - obs.y).powi(2);
            count += 1;
        }
    }
    if count == 0 {
        return Err(SolveError::Degenerate);
    }
    let rms_error = (sum_sq / count as Real).sqrt();

    info!(
        "stereo: {} views, rms {:.4} px, |t| = {:.1}",
        views.len(),
        rms_error,
        translation.norm()
    );

    Ok(StereoCalibration {
        rotation,
        translation,
        essential,
        fundamental,
        rms_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::distortion::BrownConrady5;
    use nalgebra::Translation3;

    fn board_grid(cols: usize, rows: usize, square: Real) -> Vec<Pt2> {
        let mut pts = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                pts.push(Pt2::new(i as Real * square, j as Real * square));
            }
        }
        pts
    }

    fn project(k: &Mat3, pose: &Iso3, board: &[Pt2]) -> Vec<Pt2> {
        board
            .iter()
            .map(|b| {
                let cam = pose * Pt3::new(b.x, b.y, 0.0);
                let v = k * (cam.coords / cam.z);
                Pt2::new(v.x, v.y)
            })
            .collect()
    }

    fn intrinsic(k: Mat3) -> IntrinsicCalibration {
        IntrinsicCalibration {
            camera_matrix: k,
            distortion: BrownConrady5::default(),
            rms_error: 0.0,
        }
    }

    #[test]
    fn recovers_relative_pose() {
        let k_rgb = Mat3::new(620.0, 0.0, 320.0, 0.0, 620.0, 240.0, 0.0, 0.0, 1.0);
        let k_th = Mat3::new(410.0, 0.0, 160.0, 0.0, 410.0, 120.0, 0.0, 0.0, 1.0);

        // Ground-truth RGB-from-thermal transform: small rotation, 60 mm
        // horizontal baseline.
        let x_true = Iso3::from_parts(
            Translation3::new(60.0, 3.0, -5.0),
            nalgebra::UnitQuaternion::from_euler_angles(0.02, -0.05, 0.01),
        );

        let board = board_grid(9, 6, 25.0);
        let thermal_poses = [
            Iso3::from_parts(
                Translation3::new(-90.0, -60.0, 700.0),
                nalgebra::UnitQuaternion::from_euler_angles(0.2, -0.1, 0.02),
            ),
            Iso3::from_parts(
                Translation3::new(-120.0, -40.0, 850.0),
                nalgebra::UnitQuaternion::from_euler_angles(-0.15, 0.25, -0.05),
            ),
            Iso3::from_parts(
                Translation3::new(-70.0, -80.0, 600.0),
                nalgebra::UnitQuaternion::from_euler_angles(0.05, 0.1, 0.1),
            ),
        ];

        let views: Vec<StereoView> = thermal_poses
            .iter()
            .map(|pose_th| StereoView {
                board_points: board.clone(),
                rgb_points: project(&k_rgb, &(x_true * pose_th), &board),
                thermal_points: project(&k_th, pose_th, &board),
            })
            .collect();

        let cal = calibrate_stereo(&views, &intrinsic(k_rgb), &intrinsic(k_th), 3).expect("solve");

        let t_true = x_true.translation.vector;
        assert_relative_eq!(cal.translation.x, t_true.x, epsilon = 1e-6);
        assert_relative_eq!(cal.translation.y, t_true.y, epsilon = 1e-6);
        assert_relative_eq!(cal.translation.z, t_true.z, epsilon = 1e-6);

        let r_true = *x_true.rotation.to_rotation_matrix().matrix();
        assert!((cal.rotation - r_true).norm() < 1e-6);
        assert!(cal.rms_error < 1e-6, "rms {}", cal.rms_error);

        // Epipolar constraint on the essential matrix: normalized rays from
        // both cameras to the same 3D point must satisfy x_r^T E x_t = 0.
        let p = Pt3::new(100.0, 50.0, 0.0);
        let x_th = thermal_poses[0] * p;
        let x_rgb = x_true * x_th;
        let val = (x_rgb.coords.transpose() * cal.essential * x_th.coords)[(0, 0)];
        assert!(val.abs() < 1e-6, "epipolar residual {val}");
    }

    #[test]
    fn rotation_average_handles_quaternion_sign() {
        let q = nalgebra::UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let a = Iso3::from_parts(Translation3::new(1.0, 0.0, 0.0), q);
        let neg = nalgebra::UnitQuaternion::from_quaternion(-q.into_inner());
        let b = Iso3::from_parts(Translation3::new(1.0, 0.0, 0.0), neg);

        let avg = average_rotation(&[a, b]).expect("average");
        assert!(avg.angle_to(&q) < 1e-9);
    }

    #[test]
    fn too_few_views_is_rejected() {
        let k = Mat3::identity();
        let err = calibrate_stereo(&[], &intrinsic(k), &intrinsic(k), 3).unwrap_err();
        assert_eq!(err, SolveError::NotEnoughViews { got: 0, need: 3 });
    }

    #[test]
    fn skew_symmetric_matches_cross_product() {
        let t = Vec3::new(1.0, -2.0, 3.0);
        let v = Vec3::new(0.4, 0.5, -0.6);
        let lhs = skew_symmetric(&t) * v;
        let rhs = t.cross(&v);
        assert!((lhs - rhs).norm() < 1e-12);
    }
}
