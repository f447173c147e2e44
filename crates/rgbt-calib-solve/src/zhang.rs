//! Closed-form intrinsics from plane homographies (Zhang's method).
//!
//! Each homography `H = K [r1 r2 t]` constrains the image of the absolute
//! conic `B = K^-T K^-1` through the orthonormality of `r1, r2`. Stacking
//! the constraints from all views gives a linear system whose null space
//! yields `B`, from which the intrinsic parameters are read off.

use nalgebra::{DMatrix, Vector6};
use rgbt_calib_core::{Mat3, Real};

use crate::error::SolveError;

/// Pinhole intrinsics in parameter form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
    pub skew: Real,
}

impl CameraIntrinsics {
    /// The upper-triangular camera matrix `K`.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }
}

/// `v_ij` constraint vector for columns `i`, `j` of a homography.
fn constraint_row(h: &Mat3, i: usize, j: usize) -> Vector6<Real> {
    Vector6::new(
        h[(0, i)] * h[(0, j)],
        h[(0, i)] * h[(1, j)] + h[(1, i)] * h[(0, j)],
        h[(1, i)] * h[(1, j)],
        h[(2, i)] * h[(0, j)] + h[(0, i)] * h[(2, j)],
        h[(2, i)] * h[(1, j)] + h[(1, i)] * h[(2, j)],
        h[(2, i)] * h[(2, j)],
    )
}

/// Estimate intrinsics from at least two board-to-image homographies.
///
/// A zero-skew constraint is added, so two views already determine the
/// remaining four parameters; more views overdetermine the system and
/// average out noise.
pub fn estimate_intrinsics_from_homographies(
    homographies: &[Mat3],
) -> Result<CameraIntrinsics, SolveError> {
    if homographies.len() < 2 {
        return Err(SolveError::NotEnoughViews {
            got: homographies.len(),
            need: 2,
        });
    }

    let n_rows = 2 * homographies.len() + 1;
    let mut a = DMatrix::<Real>::zeros(n_rows, 6);
    for (v, h) in homographies.iter().enumerate() {
        let v12 = constraint_row(h, 0, 1);
        let diff = constraint_row(h, 0, 0) - constraint_row(h, 1, 1);
        for c in 0..6 {
            a[(2 * v, c)] = v12[c];
            a[(2 * v + 1, c)] = diff[c];
        }
    }
    // Zero skew: B12 = 0.
    a[(n_rows - 1, 1)] = 1.0;

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(SolveError::SvdFailed)?;
    let b = v_t.row(v_t.nrows() - 1);

    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    if denom.abs() < Real::EPSILON || b11.abs() < Real::EPSILON {
        return Err(SolveError::Degenerate);
    }

    let cy = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + cy * (b12 * b13 - b11 * b23)) / b11;

    let fx2 = lambda / b11;
    let fy2 = lambda * b11 / denom;
    if fx2 <= 0.0 || fy2 <= 0.0 {
        return Err(SolveError::Degenerate);
    }
    let fx = fx2.sqrt();
    let fy = fy2.sqrt();
    let skew = -b12 * fx * fx * fy / lambda;
    let cx = skew * cy / fy - b13 * fx * fx / lambda;

    Ok(CameraIntrinsics {
        fx,
        fy,
        cx,
        cy,
        skew,
    })
}
