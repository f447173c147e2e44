//! Per-frame image quality metrics.
//!
//! These are advisory: the session logs a warning for blurry or flat frames
//! but never rejects them on quality alone (pattern detection is the gate).

use crate::{GrayImageView, Real};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameQuality {
    /// Variance of the 3x3 Laplacian response. Low values indicate blur.
    pub sharpness: Real,
    /// RMS contrast (intensity standard deviation).
    pub contrast: Real,
}

impl FrameQuality {
    /// Empirical floor below which a frame is flagged as blurry.
    pub const MIN_SHARPNESS: Real = 100.0;
    /// Empirical floor below which a frame is flagged as low-contrast.
    pub const MIN_CONTRAST: Real = 20.0;

    pub fn is_acceptable(&self) -> bool {
        self.sharpness >= Self::MIN_SHARPNESS && self.contrast >= Self::MIN_CONTRAST
    }
}

/// Compute sharpness and contrast for one frame.
pub fn assess_frame(img: &GrayImageView<'_>) -> FrameQuality {
    let n = (img.width * img.height) as Real;
    if img.width < 3 || img.height < 3 || n == 0.0 {
        return FrameQuality {
            sharpness: 0.0,
            contrast: 0.0,
        };
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &v in img.data {
        let v = v as Real;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n;
    let contrast = (sum_sq / n - mean * mean).max(0.0).sqrt();

    // Laplacian over the interior, 4-neighbor kernel.
    let mut lap_sum = 0.0;
    let mut lap_sq = 0.0;
    let mut count = 0.0;
    for y in 1..img.height - 1 {
        for x in 1..img.width - 1 {
            let c = img.data[y * img.width + x] as Real;
            let up = img.data[(y - 1) * img.width + x] as Real;
            let down = img.data[(y + 1) * img.width + x] as Real;
            let left = img.data[y * img.width + x - 1] as Real;
            let right = img.data[y * img.width + x + 1] as Real;
            let lap = up + down + left + right - 4.0 * c;
            lap_sum += lap;
            lap_sq += lap * lap;
            count += 1.0;
        }
    }
    let lap_mean = lap_sum / count;
    let sharpness = (lap_sq / count - lap_mean * lap_mean).max(0.0);

    FrameQuality {
        sharpness,
        contrast,
    }
}
