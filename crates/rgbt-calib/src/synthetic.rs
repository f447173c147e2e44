//! Synthetic two-camera rig.
//!
//! Implements [`FrameSource`] by rendering an ideal chessboard as seen by an
//! RGB and a thermal camera with known intrinsics and a known relative
//! transform. Used by the CLI demo and by end-to-end tests; the frames it
//! produces exercise the exact same path as real captures.

use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use rgbt_calib_core::{
    synthetic::render_board, GrayImage, Homography, Iso3, Mat3, PatternSpec, Real, RgbImage,
};

use crate::capture::{FramePair, FrameSource};

/// `H = K [r1 r2 t]` for a board on the `Z = 0` plane.
pub fn homography_from_pose(k: &Mat3, pose: &Iso3) -> Homography {
    let rot = pose.rotation.to_rotation_matrix();
    let r = rot.matrix();
    let mut h = Mat3::zeros();
    h.set_column(0, &(k * r.column(0)));
    h.set_column(1, &(k * r.column(1)));
    h.set_column(2, &(k * pose.translation.vector));
    Homography::new(h)
}

/// Replicate a gray frame into packed RGB.
pub fn gray_to_rgb(src: &GrayImage) -> RgbImage {
    let mut data = Vec::with_capacity(src.data.len() * 3);
    for &v in &src.data {
        data.extend_from_slice(&[v, v, v]);
    }
    RgbImage {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Deterministic synthetic RGB-thermal rig.
///
/// Every acquire call renders the next board pose in a fixed repertoire of
/// mild tilts, so repeated cycles provide the pose diversity the intrinsic
/// solver needs.
pub struct SyntheticRig {
    pattern: PatternSpec,
    k_rgb: Mat3,
    k_thermal: Mat3,
    rgb_from_thermal: Iso3,
    poses: Vec<Iso3>,
    width: usize,
    height: usize,
    next: usize,
}

impl SyntheticRig {
    pub fn new(pattern: PatternSpec, frames: usize) -> Self {
        let k_rgb = Mat3::new(600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0);
        let k_thermal = Mat3::new(450.0, 0.0, 320.0, 0.0, 450.0, 240.0, 0.0, 0.0, 1.0);
        let rgb_from_thermal = Iso3::from_parts(
            Translation3::new(40.0, 2.0, -3.0),
            UnitQuaternion::from_euler_angles(0.01, -0.02, 0.005),
        );

        // Board center in board coordinates, kept near the thermal optical
        // axis at every pose.
        let center = Vector3::new(
            (pattern.cols as Real - 1.0) * pattern.square_size / 2.0,
            (pattern.rows as Real - 1.0) * pattern.square_size / 2.0,
            0.0,
        );
        let mut poses = Vec::with_capacity(frames);
        for i in 0..frames {
            let t = i as Real;
            let rot = Rotation3::from_euler_angles(
                0.12 * (0.7 * t).sin(),
                -0.10 * (0.9 * t).cos(),
                0.03 * (0.5 * t).sin(),
            );
            let trans = Vector3::new(0.0, 0.0, 850.0 + 25.0 * t) - rot * center;
            poses.push(Iso3::from_parts(
                Translation3::from(trans),
                UnitQuaternion::from_rotation_matrix(&rot),
            ));
        }

        Self {
            pattern,
            k_rgb,
            k_thermal,
            rgb_from_thermal,
            poses,
            width: 640,
            height: 480,
            next: 0,
        }
    }

    pub fn k_rgb(&self) -> &Mat3 {
        &self.k_rgb
    }

    pub fn k_thermal(&self) -> &Mat3 {
        &self.k_thermal
    }

    /// Ground-truth transform mapping thermal-camera coordinates into
    /// RGB-camera coordinates.
    pub fn rgb_from_thermal(&self) -> &Iso3 {
        &self.rgb_from_thermal
    }
}

impl FrameSource for SyntheticRig {
    fn acquire(&mut self, _device_id: &str) -> Option<FramePair> {
        if self.poses.is_empty() {
            return None;
        }
        let pose_thermal = self.poses[self.next % self.poses.len()];
        self.next += 1;

        let pose_rgb = self.rgb_from_thermal * pose_thermal;
        let thermal = render_board(
            &self.pattern,
            &homography_from_pose(&self.k_thermal, &pose_thermal),
            self.width,
            self.height,
        )?;
        let rgb_gray = render_board(
            &self.pattern,
            &homography_from_pose(&self.k_rgb, &pose_rgb),
            self.width,
            self.height,
        )?;
        Some(FramePair {
            rgb: gray_to_rgb(&rgb_gray),
            thermal,
        })
    }
}
