//! Brown-Conrady lens distortion: forward/inverse model and a linear
//! least-squares fit from homography residuals.
//!
//! The fit compares homography-predicted positions (an ideal pinhole
//! projection) with the observed, distorted pixels; the residuals in
//! normalized coordinates are linear in the distortion coefficients. This
//! is an initialization-grade estimate, accurate for small-to-moderate
//! distortion, which is all the engine's single-pass solve calls for.

use nalgebra::DMatrix;
use rgbt_calib_core::{Mat3, Pt2, Real, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Brown-Conrady distortion coefficients (radial k1..k3, tangential p1, p2).
///
/// `k3` is kept in the model for storage compatibility but the linear fit
/// leaves it at zero: the r^6 term overfits with typical calibration data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub k3: Real,
    pub p1: Real,
    pub p2: Real,
}

impl BrownConrady5 {
    const UNDISTORT_ITERS: u32 = 8;

    fn distort_impl(&self, x: Real, y: Real) -> (Real, Real) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Apply distortion to a normalized image point.
    pub fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vec2::new(xd, yd)
    }

    /// Remove distortion by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        let mut x = n_dist.x;
        let mut y = n_dist.y;
        for _ in 0..Self::UNDISTORT_ITERS {
            let (xd, yd) = self.distort_impl(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vec2::new(x, y)
    }

    /// Coefficients as the conventional `[k1, k2, p1, p2, k3]` vector.
    pub fn as_vector(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }
}

/// One view's input for distortion fitting: the homography must be computed
/// from the **distorted** pixels, so the residuals carry the distortion.
#[derive(Debug, Clone, Copy)]
pub struct DistortionFitView<'a> {
    pub homography: Mat3,
    pub board_points: &'a [Pt2],
    pub pixel_points: &'a [Pt2],
}

fn normalized(k_inv: &Mat3, p: Pt2) -> Vec2 {
    let v = k_inv * Vec3::new(p.x, p.y, 1.0);
    Vec2::new(v.x / v.z, v.y / v.z)
}

/// Undistort pixel coordinates through `K` and back.
pub fn undistort_pixels(k: &Mat3, dist: &BrownConrady5, pts: &[Pt2]) -> Option<Vec<Pt2>> {
    let k_inv = k.try_inverse()?;
    Some(
        pts.iter()
            .map(|&p| {
                let n = dist.undistort(&normalized(&k_inv, p));
                let v = k * Vec3::new(n.x, n.y, 1.0);
                Pt2::new(v.x / v.z, v.y / v.z)
            })
            .collect(),
    )
}

/// Estimate `k1, k2, p1, p2` (k3 fixed at zero) from homography residuals.
///
/// Fails with [`SolveError::Degenerate`] when every point sits near the
/// principal point (no radial diversity to constrain the radial terms).
pub fn fit_distortion(
    intrinsics: &Mat3,
    views: &[DistortionFitView<'_>],
) -> Result<BrownConrady5, SolveError> {
    const N_PARAMS: usize = 4; // k1, k2, p1, p2

    let total_points: usize = views.iter().map(|v| v.board_points.len()).sum();
    let min_points = N_PARAMS / 2 + 3;
    if total_points < min_points {
        return Err(SolveError::NotEnoughViews {
            got: total_points,
            need: min_points,
        });
    }

    let k_inv = intrinsics
        .try_inverse()
        .ok_or(SolveError::SingularIntrinsics)?;

    let mut a = DMatrix::<Real>::zeros(2 * total_points, N_PARAMS);
    let mut b = nalgebra::DVector::<Real>::zeros(2 * total_points);

    let mut max_r2 = 0.0;
    let mut row = 0;
    for view in views {
        for (board_pt, pixel_obs) in view.board_points.iter().zip(view.pixel_points) {
            let ideal_h = view.homography * Vec3::new(board_pt.x, board_pt.y, 1.0);
            let ideal = Pt2::new(ideal_h.x / ideal_h.z, ideal_h.y / ideal_h.z);

            let n_ideal = normalized(&k_inv, ideal);
            let n_obs = normalized(&k_inv, *pixel_obs);
            let residual = n_obs - n_ideal;

            let x = n_ideal.x;
            let y = n_ideal.y;
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            if r2 > max_r2 {
                max_r2 = r2;
            }

            // n_obs ~ n_ideal + x*(k1 r^2 + k2 r^4) + tangential terms
            a[(row, 0)] = x * r2;
            a[(row + 1, 0)] = y * r2;
            a[(row, 1)] = x * r4;
            a[(row + 1, 1)] = y * r4;
            a[(row, 2)] = 2.0 * x * y;
            a[(row + 1, 2)] = r2 + 2.0 * y * y;
            a[(row, 3)] = r2 + 2.0 * x * x;
            a[(row + 1, 3)] = 2.0 * x * y;

            b[row] = residual.x;
            b[row + 1] = residual.y;
            row += 2;
        }
    }

    if max_r2 < 1e-6 {
        return Err(SolveError::Degenerate);
    }

    let svd = a.svd(true, true);
    let x = svd.solve(&b, 1e-12).map_err(|_| SolveError::SvdFailed)?;

    Ok(BrownConrady5 {
        k1: x[0],
        k2: x[1],
        k3: 0.0,
        p1: x[2],
        p2: x[3],
    })
}
