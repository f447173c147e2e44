//! Full pipeline against rendered frames: real chessboard detection on the
//! synthetic rig, then the complete solve. Tolerances are loose since the
//! detector localizes corners to a fraction of a pixel, not exactly.

use rgbt_calib::chessboard::ChessboardDetector;
use rgbt_calib::core::PatternSpec;
use rgbt_calib::synthetic::SyntheticRig;
use rgbt_calib::{SessionConfig, SessionController};

#[test]
fn detector_driven_session_calibrates_the_rig() {
    let pattern = PatternSpec::default();
    let dir = tempfile::tempdir().unwrap();
    let mut config = SessionConfig::new(dir.path());
    config.pattern = pattern;

    let mut engine = SessionController::new(config, ChessboardDetector::default());
    let mut rig = SyntheticRig::new(pattern, 12);

    engine.start(&["cam0".to_string()], Some("e2e")).unwrap();
    let mut accepted = 0;
    for _ in 0..12 {
        let report = engine.capture_cycle(&mut rig).unwrap();
        if report.devices["cam0"].status == rgbt_calib::CaptureStatus::Accepted {
            accepted += 1;
        }
    }
    assert!(accepted >= 10, "only {accepted} of 12 frames accepted");

    let report = engine.compute(None).unwrap();
    assert!(
        report.success,
        "compute failed: {:?}",
        report.devices["cam0"].failure
    );

    let result = engine.result("cam0").expect("stored result");
    let rgb = result.rgb.as_ref().unwrap();
    let thermal = result.thermal.as_ref().unwrap();

    // Rig ground truth: fx 600 (RGB) and 450 (thermal).
    assert!(
        (rgb.camera_matrix[(0, 0)] - 600.0).abs() < 90.0,
        "rgb fx {}",
        rgb.camera_matrix[(0, 0)]
    );
    assert!(
        (thermal.camera_matrix[(0, 0)] - 450.0).abs() < 70.0,
        "thermal fx {}",
        thermal.camera_matrix[(0, 0)]
    );
    assert!(rgb.rms_error < 3.0, "rgb rms {}", rgb.rms_error);
    assert!(thermal.rms_error < 3.0, "thermal rms {}", thermal.rms_error);
    assert!(result.stereo.is_some());
    assert!(result.homography.is_some());

    let end = engine.end().unwrap();
    assert!(end.success);
}
