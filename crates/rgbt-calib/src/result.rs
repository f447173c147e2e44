//! Persisted calibration results.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rgbt_calib_core::Homography;
use rgbt_calib_solve::{IntrinsicCalibration, StereoCalibration};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::quality::QualityAssessment;

/// Everything solved for one device.
///
/// Intrinsic fields are populated independently per modality; stereo and
/// homography require both. A result is *valid* only when both intrinsic
/// solves produced parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub device_id: String,
    pub rgb: Option<IntrinsicCalibration>,
    pub thermal: Option<IntrinsicCalibration>,
    pub stereo: Option<StereoCalibration>,
    /// Thermal-to-RGB overlay homography, derived from one representative
    /// view (plane-valid only).
    pub homography: Option<Homography>,
    pub quality: QualityAssessment,
    /// Unix seconds at the end of the solve.
    pub completed_at: u64,
}

impl CalibrationResult {
    /// Both intrinsic solves succeeded.
    pub fn is_valid(&self) -> bool {
        self.rgb.is_some() && self.thermal.is_some()
    }

    /// Conventional result file name inside a session directory.
    pub fn file_name(device_id: &str) -> String {
        format!("calibration_{device_id}.json")
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a result independently of the session that produced it.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Load a device's result from a session directory, using the
    /// conventional file name.
    pub fn load_for(session_dir: &Path, device_id: &str) -> Result<Self, StoreError> {
        Self::load(&session_dir.join(Self::file_name(device_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::assess_quality;
    use rgbt_calib_core::{Mat3, Vec3};
    use rgbt_calib_solve::BrownConrady5;

    fn sample_result() -> CalibrationResult {
        let intr = IntrinsicCalibration {
            camera_matrix: Mat3::new(
                612.345678901,
                0.0,
                319.5,
                0.0,
                633.2,
                241.75,
                0.0,
                0.0,
                1.0,
            ),
            distortion: BrownConrady5 {
                k1: -0.123456789,
                k2: 0.0123,
                k3: 0.0,
                p1: 1e-4,
                p2: -2e-4,
            },
            rms_error: 0.4321,
        };
        let stereo = StereoCalibration {
            rotation: Mat3::identity(),
            translation: Vec3::new(60.0, 2.5, -4.0),
            essential: Mat3::new(0.0, 4.0, 2.5, -4.0, 0.0, -60.0, -2.5, 60.0, 0.0),
            fundamental: Mat3::new(1e-7, 2e-6, 1e-4, -2e-6, 0.0, -1e-2, -1e-4, 1e-2, 1.0),
            rms_error: 0.789,
        };
        CalibrationResult {
            device_id: "cam0".to_owned(),
            rgb: Some(intr.clone()),
            thermal: Some(intr),
            stereo: Some(stereo),
            homography: Some(Homography::from_array([
                [1.1, 0.01, 12.5],
                [-0.02, 0.98, -3.25],
                [1e-5, -2e-5, 1.0],
            ])),
            quality: assess_quality(Some(0.4321), Some(0.4321), Some(0.789)),
            completed_at: 1_756_400_000,
        }
    }

    #[test]
    fn save_load_round_trips_every_field() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CalibrationResult::file_name("cam0"));

        result.save(&path).unwrap();
        let loaded = CalibrationResult::load(&path).unwrap();
        assert_eq!(loaded, result);

        let by_device = CalibrationResult::load_for(dir.path(), "cam0").unwrap();
        assert_eq!(by_device, result);
    }

    #[test]
    fn validity_requires_both_intrinsics() {
        let mut result = sample_result();
        assert!(result.is_valid());
        result.thermal = None;
        assert!(!result.is_valid());
    }

    #[test]
    fn load_of_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CalibrationResult::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
