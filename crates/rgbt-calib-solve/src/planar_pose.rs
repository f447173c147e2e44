//! Camera pose from a board-to-image homography.

use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use rgbt_calib_core::{Iso3, Mat3, Real};

use crate::error::SolveError;

/// Decompose `H = K [r1 r2 t]` into a rigid transform (board frame to
/// camera frame).
///
/// The first two columns of `K^-1 H` are scaled rotation columns; the scale
/// is normalized away, the sign is fixed so the board lies in front of the
/// camera, and the reconstituted rotation is projected onto SO(3) with an
/// SVD.
pub fn pose_from_homography(k: &Mat3, h: &Mat3) -> Result<Iso3, SolveError> {
    let k_inv = k.try_inverse().ok_or(SolveError::SingularIntrinsics)?;
    let m = k_inv * h;

    let c0 = m.column(0).into_owned();
    let c1 = m.column(1).into_owned();
    let c2 = m.column(2).into_owned();

    let scale = (c0.norm() * c1.norm()).sqrt();
    if scale < Real::EPSILON {
        return Err(SolveError::Degenerate);
    }
    // Positive depth of the board origin.
    let sign = if c2.z / scale < 0.0 { -1.0 } else { 1.0 };
    let inv_scale = sign / scale;

    let r0: Vector3<Real> = c0 * inv_scale;
    let r1: Vector3<Real> = c1 * inv_scale;
    let r2 = r0.cross(&r1);
    let t = c2 * inv_scale;

    let mut r = Mat3::zeros();
    r.set_column(0, &r0);
    r.set_column(1, &r1);
    r.set_column(2, &r2);

    // Nearest rotation matrix.
    let svd = r.svd(true, true);
    let u = svd.u.ok_or(SolveError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(SolveError::SvdFailed)?;
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.column_mut(2).neg_mut();
        rot = u_fixed * v_t;
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));
    Ok(Iso3::from_parts(Translation3::from(t), rotation))
}
