//! Thermal-on-RGB overlay rendering.
//!
//! Warps a live thermal frame into RGB pixel space through the stored
//! overlay homography, maps intensity through a jet-like pseudo-color ramp,
//! and alpha-blends the result onto the RGB frame.

use rgbt_calib_core::{warp_perspective_gray, GrayImageView, Real, RgbImage};

use crate::result::CalibrationResult;

/// Blend weight used when the caller has no preference.
pub const DEFAULT_ALPHA: Real = 0.3;

/// Jet-like pseudo-color ramp: dark blue through green to dark red.
pub fn jet_color(v: u8) -> [u8; 3] {
    let t = v as Real / 255.0;
    let ch = |x: Real| ((1.5 - x.abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [ch(4.0 * t - 3.0), ch(4.0 * t - 2.0), ch(4.0 * t - 1.0)]
}

/// Warp + colorize + blend. Returns `None` when the result carries no
/// overlay homography or it is not invertible.
///
/// `alpha` weights the thermal layer and is clamped to `[0, 1]`.
pub fn apply_overlay(
    result: &CalibrationResult,
    rgb: &RgbImage,
    thermal: &GrayImageView<'_>,
    alpha: Real,
) -> Option<RgbImage> {
    let h = result.homography?;
    let warped = warp_perspective_gray(thermal, h, rgb.width, rgb.height)?;

    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = RgbImage::new(rgb.width, rgb.height);
    for y in 0..rgb.height {
        for x in 0..rgb.width {
            let base = rgb.pixel(x, y);
            let heat = jet_color(warped.data[y * rgb.width + x]);
            let mut px = [0u8; 3];
            for c in 0..3 {
                let v = alpha * heat[c] as Real + (1.0 - alpha) * base[c] as Real;
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            out.set_pixel(x, y, px);
        }
    }
    Some(out)
}
