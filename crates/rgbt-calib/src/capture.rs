//! Acquisition contract between the session controller and whatever
//! transport actually fetches frames from capture devices.

use std::fmt;

use rgbt_calib_core::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// The two sensors of one capture device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Rgb,
    Thermal,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Rgb => f.write_str("rgb"),
            Modality::Thermal => f.write_str("thermal"),
        }
    }
}

/// One simultaneous RGB + thermal capture from a single device.
#[derive(Clone, Debug)]
pub struct FramePair {
    pub rgb: RgbImage,
    /// Thermal frames arrive already mapped to 8-bit intensity.
    pub thermal: GrayImage,
}

/// Source of frame pairs, one request per device per capture cycle.
///
/// Implementations return `None` for a device that failed to deliver; the
/// cycle records the failure and continues with the remaining devices.
pub trait FrameSource {
    fn acquire(&mut self, device_id: &str) -> Option<FramePair>;
}
