use crate::{
    from_homogeneous, sample_bilinear_u8, to_homogeneous, GrayImage, GrayImageView, Mat3, Pt2,
    Real,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A 2D projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Mat3,
}

impl Homography {
    pub fn new(h: Mat3) -> Self {
        Self { h }
    }

    pub fn from_array(rows: [[Real; 3]; 3]) -> Self {
        Self::new(Mat3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[Real; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Pt2) -> Pt2 {
        from_homogeneous(&(self.h * to_homogeneous(&p)))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_normalization(cx: Real, cy: Real, mean_dist: Real) -> Mat3 {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Pt2]) -> (Vec<Pt2>, Mat3) {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let n = pts.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_normalization(cx, cy, mean_dist);

    let mut out = Vec::with_capacity(pts.len());
    for p in pts {
        let v = t * to_homogeneous(p);
        out.push(Pt2::new(v.x, v.y));
    }
    (out, t)
}

fn normalize_homography(h: Mat3) -> Option<Mat3> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(hn: Mat3, t_src: Mat3, t_dst: Mat3) -> Option<Mat3> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate H such that `dst ~ H * src`, from at least 4 correspondences.
///
/// Point order must be consistent between `src` and `dst`.
pub fn estimate_homography(src: &[Pt2], dst: &[Pt2]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let (s, ts) = normalize_points(src);
    let (d, td) = normalize_points(dst);

    // Build A (2N x 9)
    let n = src.len();
    let mut a = DMatrix::<Real>::zeros(2 * n, 9);

    for k in 0..n {
        let x = s[k].x;
        let y = s[k].y;
        let u = d[k].x;
        let v = d[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Solve Ah = 0 -> h is right singular vector with smallest singular value
    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let last = vt.nrows().checked_sub(1)?;
    let h = vt.row(last); // last row of V^T = last column of V

    let hn = Mat3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = Td^{-1} * Hn * Ts
    let h_den = denormalize_homography(hn, ts, td)?;
    let h_den = normalize_homography(h_den)?;

    Some(Homography::new(h_den))
}

/// Warp `src` through `h_out_from_src`: for each output pixel, map back
/// through the inverse and sample.
///
/// Returns `None` if the homography is not invertible.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_out_from_src: Homography,
    out_w: usize,
    out_h: usize,
) -> Option<GrayImage> {
    let inv = h_out_from_src.inverse()?;
    let mut out = vec![0u8; out_w * out_h];

    for y in 0..out_h {
        for x in 0..out_w {
            // sample at pixel center
            let p = inv.apply(Pt2::new(x as Real + 0.5, y as Real + 0.5));
            out[y * out_w + x] = sample_bilinear_u8(src, p.x as f32, p.y as f32);
        }
    }

    Some(GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    })
}
