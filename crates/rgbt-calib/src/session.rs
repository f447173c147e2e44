//! Calibration session lifecycle and per-device orchestration.
//!
//! The controller owns all mutable session state; every mutation goes
//! through `&mut self`, and the capture-in-flight flag serializes capture
//! cycles inside the active state. State machine: idle -> active (on
//! [`SessionController::start`]) -> idle (on [`SessionController::end`]).
//! At most one session exists per controller.
//!
//! Frames are gated at capture time: a frame counts for a device only when
//! the pattern is detected in **both** modalities, so the per-device counter
//! equals the number of valid correspondences available to the solvers.

use std::collections::BTreeMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rgbt_calib_core::{
    assess_frame, estimate_homography, rgb_to_luma, GrayImage, PatternDetector,
    PatternObservation, PatternSpec, Pt2, Pt3, RgbImage,
};
use rgbt_calib_solve::{calibrate_intrinsics, calibrate_stereo, CalibrationView, StereoView};
use serde::{Deserialize, Serialize};

use crate::capture::{FrameSource, Modality};
use crate::errors::{DeviceFailure, SessionError, StoreError};
use crate::quality::assess_quality;
use crate::result::CalibrationResult;

const SESSION_INFO_FILE: &str = "session_info.json";

/// Engine configuration, fixed at construction time.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub pattern: PatternSpec,
    /// Minimum dual-modality correspondences before a solve is attempted.
    pub min_valid_frames: usize,
    /// Directory receiving one subdirectory per session.
    pub output_dir: PathBuf,
}

impl SessionConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pattern: PatternSpec::default(),
            min_valid_frames: 10,
            output_dir: output_dir.into(),
        }
    }
}

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Completed,
}

/// Persisted session metadata (`session_info.json`), written at `start`
/// and overwritten at `end`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub device_ids: Vec<String>,
    pub pattern: PatternSpec,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub status: SessionState,
    pub total_captures: BTreeMap<String, usize>,
    pub calibrated_devices: Vec<String>,
}

/// One capture instant where both modalities detected the full pattern.
#[derive(Clone, Debug)]
pub struct ValidCorrespondence {
    pub rgb_points: Vec<Pt2>,
    pub thermal_points: Vec<Pt2>,
}

#[derive(Debug, Default)]
struct DeviceState {
    captured: usize,
    rgb_frames: Vec<RgbImage>,
    thermal_frames: Vec<GrayImage>,
    correspondences: Vec<ValidCorrespondence>,
}

struct ActiveSession {
    info: SessionInfo,
    dir: PathBuf,
    /// Object points generated once from the pattern geometry.
    object_points: Vec<Pt3>,
    devices: BTreeMap<String, DeviceState>,
    results: BTreeMap<String, CalibrationResult>,
}

/// Outcome of one device in a capture cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStatus {
    Accepted,
    /// At least one modality failed to detect the pattern; counter not
    /// incremented.
    PatternNotFound,
    /// The frame source delivered nothing for this device.
    AcquisitionFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCapture {
    pub status: CaptureStatus,
    /// Valid-correspondence total after this cycle.
    pub total: usize,
}

/// Result of one capture cycle across all devices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Every device accepted a frame.
    pub success: bool,
    /// The cycle was skipped because another one was in flight.
    pub busy: bool,
    pub devices: BTreeMap<String, DeviceCapture>,
}

/// Outcome of one device in a compute call. A failed device may still carry
/// a partial result (e.g. one modality calibrated).
#[derive(Debug)]
pub struct DeviceOutcome {
    pub result: Option<CalibrationResult>,
    pub failure: Option<DeviceFailure>,
}

impl DeviceOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of a compute call; `success` is the AND over all devices.
#[derive(Debug, Default)]
pub struct ComputeReport {
    pub success: bool,
    pub devices: BTreeMap<String, DeviceOutcome>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EndReport {
    pub success: bool,
    /// Final metadata when a session was actually ended.
    pub info: Option<SessionInfo>,
}

/// Read-only session snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusSnapshot {
    pub active: bool,
    pub name: Option<String>,
    pub device_ids: Vec<String>,
    pub captured: BTreeMap<String, usize>,
    pub can_compute: BTreeMap<String, bool>,
    pub calibrated_devices: Vec<String>,
    pub capture_in_flight: bool,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn write_session_info(dir: &Path, info: &SessionInfo) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    let file = fs::File::create(dir.join(SESSION_INFO_FILE))?;
    serde_json::to_writer_pretty(BufWriter::new(file), info)?;
    Ok(())
}

/// Owns the calibration state machine and drives detection and solving per
/// device.
pub struct SessionController<D> {
    config: SessionConfig,
    detector: D,
    session: Option<ActiveSession>,
    capture_in_flight: bool,
}

impl<D: PatternDetector> SessionController<D> {
    pub fn new(config: SessionConfig, detector: D) -> Self {
        Self {
            config,
            detector,
            session: None,
            capture_in_flight: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Begin a new session over `device_ids`, optionally named.
    ///
    /// Fails with [`SessionError::SessionConflict`] while another session is
    /// active. Duplicate ids collapse into one device entry (operator
    /// error, not a runtime fault). If the metadata file cannot be written,
    /// no session is created.
    pub fn start(
        &mut self,
        device_ids: &[String],
        name: Option<&str>,
    ) -> Result<SessionInfo, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::SessionConflict);
        }
        if device_ids.is_empty() {
            return Err(SessionError::NoDevices);
        }

        let started_at = unix_now();
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| format!("calibration_{started_at}"));

        let mut devices = BTreeMap::new();
        for id in device_ids {
            devices.insert(id.clone(), DeviceState::default());
        }

        let info = SessionInfo {
            name: name.clone(),
            device_ids: devices.keys().cloned().collect(),
            pattern: self.config.pattern,
            started_at,
            completed_at: None,
            status: SessionState::Active,
            total_captures: devices.keys().map(|k| (k.clone(), 0)).collect(),
            calibrated_devices: Vec::new(),
        };

        let dir = self.config.output_dir.join(&name);
        write_session_info(&dir, &info)?;

        info!(
            "session {name} started with {} device(s), pattern {}x{}",
            devices.len(),
            self.config.pattern.cols,
            self.config.pattern.rows
        );
        self.session = Some(ActiveSession {
            info: info.clone(),
            dir,
            object_points: self.config.pattern.object_points(),
            devices,
            results: BTreeMap::new(),
        });
        Ok(info)
    }

    /// Request one frame pair per device and run pattern detection on both
    /// modalities.
    ///
    /// A frame is accepted (counter incremented, correspondence appended)
    /// only when both detections succeed. Returns a busy report without any
    /// mutation while another cycle is in flight.
    pub fn capture_cycle(
        &mut self,
        source: &mut dyn FrameSource,
    ) -> Result<CaptureReport, SessionError> {
        if self.session.is_none() {
            return Err(SessionError::NoActiveSession);
        }
        // A plain `&mut self` caller can never observe `busy`: the flag is
        // set and cleared inside this call. It only trips once the
        // controller is driven through a shared-state wrapper that can
        // re-enter between the set and the clear (e.g. a poller holding the
        // controller behind a lock with reporting on a separate path).
        if self.capture_in_flight {
            return Ok(CaptureReport {
                success: false,
                busy: true,
                devices: BTreeMap::new(),
            });
        }

        self.capture_in_flight = true;
        let report = self.run_capture_cycle(source);
        self.capture_in_flight = false;
        Ok(report)
    }

    fn run_capture_cycle(&mut self, source: &mut dyn FrameSource) -> CaptureReport {
        let pattern = self.config.pattern;
        let Some(session) = self.session.as_mut() else {
            return CaptureReport::default();
        };

        let mut devices = BTreeMap::new();
        for (id, state) in session.devices.iter_mut() {
            let status = match source.acquire(id) {
                None => {
                    warn!("{id}: frame acquisition failed");
                    CaptureStatus::AcquisitionFailed
                }
                Some(pair) => {
                    let luma = rgb_to_luma(&pair.rgb);
                    let rgb_obs = self.detector.detect(&luma.view(), &pattern);
                    let thermal_obs = self.detector.detect(&pair.thermal.view(), &pattern);
                    match (rgb_obs, thermal_obs) {
                        (
                            PatternObservation::Found(rgb_points),
                            PatternObservation::Found(thermal_points),
                        ) => {
                            let quality = assess_frame(&luma.view());
                            if !quality.is_acceptable() {
                                warn!(
                                    "{id}: low frame quality (sharpness {:.0}, contrast {:.0})",
                                    quality.sharpness, quality.contrast
                                );
                            }
                            state.rgb_frames.push(pair.rgb);
                            state.thermal_frames.push(pair.thermal);
                            state.correspondences.push(ValidCorrespondence {
                                rgb_points,
                                thermal_points,
                            });
                            state.captured += 1;
                            CaptureStatus::Accepted
                        }
                        _ => {
                            debug!("{id}: pattern not detected in both modalities");
                            CaptureStatus::PatternNotFound
                        }
                    }
                }
            };
            session.info.total_captures.insert(id.clone(), state.captured);
            devices.insert(
                id.clone(),
                DeviceCapture {
                    status,
                    total: state.captured,
                },
            );
        }

        let success = devices
            .values()
            .all(|d| d.status == CaptureStatus::Accepted);
        CaptureReport {
            success,
            busy: false,
            devices,
        }
    }

    /// Per-device readiness: has the valid-correspondence count reached the
    /// configured minimum.
    pub fn can_compute(
        &self,
        device_id: Option<&str>,
    ) -> Result<BTreeMap<String, bool>, SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NoActiveSession)?;
        if let Some(d) = device_id {
            if !session.devices.contains_key(d) {
                return Err(SessionError::UnknownDevice(d.to_owned()));
            }
        }

        Ok(session
            .devices
            .iter()
            .filter(|(id, _)| device_id.is_none_or(|d| d == id.as_str()))
            .map(|(id, state)| {
                (
                    id.clone(),
                    state.correspondences.len() >= self.config.min_valid_frames,
                )
            })
            .collect())
    }

    /// Run the full pipeline for one device or all of them.
    ///
    /// Per-device failures are collected; sibling devices always proceed.
    /// A device's result is stored and persisted only when its whole
    /// pipeline succeeded, but partial results are still reported.
    pub fn compute(&mut self, device_id: Option<&str>) -> Result<ComputeReport, SessionError> {
        let min = self.config.min_valid_frames;
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        if let Some(d) = device_id {
            if !session.devices.contains_key(d) {
                return Err(SessionError::UnknownDevice(d.to_owned()));
            }
        }

        let board: Vec<Pt2> = session
            .object_points
            .iter()
            .map(|p| Pt2::new(p.x, p.y))
            .collect();
        let ids: Vec<String> = session
            .devices
            .keys()
            .filter(|id| device_id.is_none_or(|d| d == id.as_str()))
            .cloned()
            .collect();

        let mut devices = BTreeMap::new();
        for id in ids {
            let Some(state) = session.devices.get(&id) else {
                continue;
            };
            let mut outcome = compute_device(&id, state, &board, min);
            if outcome.failure.is_none() {
                if let Some(result) = &outcome.result {
                    let path = session.dir.join(CalibrationResult::file_name(&id));
                    match result.save(&path) {
                        Ok(()) => {
                            session.results.insert(id.clone(), result.clone());
                            if !session.info.calibrated_devices.contains(&id) {
                                session.info.calibrated_devices.push(id.clone());
                            }
                        }
                        Err(e) => outcome.failure = Some(DeviceFailure::Persistence(e)),
                    }
                }
            }
            devices.insert(id, outcome);
        }

        let success = devices.values().all(DeviceOutcome::succeeded);
        Ok(ComputeReport { success, devices })
    }

    /// End the active session: stamp completion, persist final metadata,
    /// then drop all in-memory state unconditionally.
    ///
    /// Soft no-op (`success: false`) without an active session. If the
    /// final metadata cannot be written the session stays intact so the
    /// caller can retry.
    pub fn end(&mut self) -> Result<EndReport, SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(EndReport {
                success: false,
                info: None,
            });
        };

        session.info.completed_at = Some(unix_now());
        session.info.status = SessionState::Completed;
        for (id, state) in &session.devices {
            session.info.total_captures.insert(id.clone(), state.captured);
        }
        write_session_info(&session.dir, &session.info)?;

        let info = session.info.clone();
        info!(
            "session {} ended: {} of {} device(s) calibrated",
            info.name,
            info.calibrated_devices.len(),
            info.device_ids.len()
        );
        self.session = None;
        self.capture_in_flight = false;
        Ok(EndReport {
            success: true,
            info: Some(info),
        })
    }

    /// Read-only snapshot of the engine state.
    pub fn status(&self) -> StatusSnapshot {
        match &self.session {
            None => StatusSnapshot::default(),
            Some(session) => StatusSnapshot {
                active: true,
                name: Some(session.info.name.clone()),
                device_ids: session.info.device_ids.clone(),
                captured: session
                    .devices
                    .iter()
                    .map(|(id, s)| (id.clone(), s.captured))
                    .collect(),
                can_compute: session
                    .devices
                    .iter()
                    .map(|(id, s)| {
                        (
                            id.clone(),
                            s.correspondences.len() >= self.config.min_valid_frames,
                        )
                    })
                    .collect(),
                calibrated_devices: session.info.calibrated_devices.clone(),
                capture_in_flight: self.capture_in_flight,
            },
        }
    }

    /// In-memory result for a device, if its pipeline succeeded this
    /// session.
    pub fn result(&self, device_id: &str) -> Option<&CalibrationResult> {
        self.session.as_ref()?.results.get(device_id)
    }

    /// Directory of the active session's files.
    pub fn session_dir(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.dir.as_path())
    }
}

/// The per-device pipeline: intrinsics per modality, then stereo, then the
/// overlay homography, then quality scoring.
fn compute_device(id: &str, state: &DeviceState, board: &[Pt2], min: usize) -> DeviceOutcome {
    let got = state.correspondences.len();
    if got < min {
        debug!("{id}: {got} correspondences, need {min}");
        return DeviceOutcome {
            result: None,
            failure: Some(DeviceFailure::InsufficientCorrespondences { got, need: min }),
        };
    }

    let rgb_views: Vec<CalibrationView> = state
        .correspondences
        .iter()
        .map(|c| CalibrationView {
            board_points: board.to_vec(),
            image_points: c.rgb_points.clone(),
        })
        .collect();
    let thermal_views: Vec<CalibrationView> = state
        .correspondences
        .iter()
        .map(|c| CalibrationView {
            board_points: board.to_vec(),
            image_points: c.thermal_points.clone(),
        })
        .collect();
    let rgb_cal = calibrate_intrinsics(&rgb_views, min);
    let thermal_cal = calibrate_intrinsics(&thermal_views, min);

    let mut stereo = None;
    let mut homography = None;
    let mut failure = match (&rgb_cal, &thermal_cal) {
        (Err(e), _) => Some(DeviceFailure::Intrinsics {
            modality: Modality::Rgb,
            source: *e,
        }),
        (_, Err(e)) => Some(DeviceFailure::Intrinsics {
            modality: Modality::Thermal,
            source: *e,
        }),
        (Ok(rgb), Ok(thermal)) => {
            let stereo_views: Vec<StereoView> = state
                .correspondences
                .iter()
                .map(|c| StereoView {
                    board_points: board.to_vec(),
                    rgb_points: c.rgb_points.clone(),
                    thermal_points: c.thermal_points.clone(),
                })
                .collect();
            match calibrate_stereo(&stereo_views, rgb, thermal, min) {
                Ok(s) => {
                    stereo = Some(s);
                    None
                }
                Err(e) => Some(DeviceFailure::Stereo(e)),
            }
        }
    };

    if failure.is_none() {
        // Overlay homography from one representative view. Single-frame by
        // design: valid near the board plane, which is all the overlay
        // needs.
        let first = &state.correspondences[0];
        homography = estimate_homography(&first.thermal_points, &first.rgb_points);
        if homography.is_none() {
            failure = Some(DeviceFailure::HomographyFailed);
        }
    }

    let rgb = rgb_cal.ok();
    let thermal = thermal_cal.ok();
    let quality = assess_quality(
        rgb.as_ref().map(|c| c.rms_error),
        thermal.as_ref().map(|c| c.rms_error),
        stereo.as_ref().map(|s| s.rms_error),
    );
    match &failure {
        None => info!("{id}: calibrated from {got} views, quality {:?}", quality.label),
        Some(f) => warn!("{id}: calibration failed: {f}"),
    }

    DeviceOutcome {
        result: Some(CalibrationResult {
            device_id: id.to_owned(),
            rgb,
            thermal,
            stereo,
            homography,
            quality,
            completed_at: unix_now(),
        }),
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FramePair;
    use rgbt_calib_core::GrayImageView;

    /// Detects the full grid at fixed, geometry-free positions. Enough for
    /// lifecycle tests that never reach the solvers.
    struct AlwaysFound;

    impl PatternDetector for AlwaysFound {
        fn detect(&self, _image: &GrayImageView<'_>, spec: &PatternSpec) -> PatternObservation {
            let pts = spec
                .board_points()
                .iter()
                .map(|p| Pt2::new(p.x + 40.0, p.y + 40.0))
                .collect();
            PatternObservation::Found(pts)
        }
    }

    struct NeverFound;

    impl PatternDetector for NeverFound {
        fn detect(&self, _image: &GrayImageView<'_>, _spec: &PatternSpec) -> PatternObservation {
            PatternObservation::NotFound
        }
    }

    struct TinySource;

    impl FrameSource for TinySource {
        fn acquire(&mut self, _device_id: &str) -> Option<FramePair> {
            Some(FramePair {
                rgb: RgbImage::new(8, 8),
                thermal: GrayImage::new(8, 8),
            })
        }
    }

    struct DeadSource;

    impl FrameSource for DeadSource {
        fn acquire(&mut self, _device_id: &str) -> Option<FramePair> {
            None
        }
    }

    fn controller(
        dir: &tempfile::TempDir,
        min_valid_frames: usize,
    ) -> SessionController<AlwaysFound> {
        let mut config = SessionConfig::new(dir.path());
        config.min_valid_frames = min_valid_frames;
        SessionController::new(config, AlwaysFound)
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn second_start_is_a_conflict_and_preserves_counters() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), Some("first")).unwrap();
        ctl.capture_cycle(&mut TinySource).unwrap();

        let err = ctl.start(&ids(&["B"]), None).unwrap_err();
        assert!(matches!(err, SessionError::SessionConflict));

        let status = ctl.status();
        assert_eq!(status.name.as_deref(), Some("first"));
        assert_eq!(status.captured["A"], 1);
    }

    #[test]
    fn empty_device_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        assert!(matches!(
            ctl.start(&[], None).unwrap_err(),
            SessionError::NoDevices
        ));
        assert!(!ctl.status().active);
    }

    #[test]
    fn duplicate_device_ids_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        let info = ctl.start(&ids(&["A", "A", "A"]), None).unwrap();
        assert_eq!(info.device_ids, vec!["A".to_string()]);
    }

    #[test]
    fn default_name_carries_the_start_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        let info = ctl.start(&ids(&["A"]), None).unwrap();
        assert_eq!(info.name, format!("calibration_{}", info.started_at));
    }

    #[test]
    fn capture_without_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        assert!(matches!(
            ctl.capture_cycle(&mut TinySource).unwrap_err(),
            SessionError::NoActiveSession
        ));
    }

    #[test]
    fn can_compute_flips_at_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A", "B"]), None).unwrap();

        let ready = ctl.can_compute(None).unwrap();
        assert!(!ready["A"] && !ready["B"]);

        for _ in 0..2 {
            ctl.capture_cycle(&mut TinySource).unwrap();
        }
        assert!(!ctl.can_compute(Some("A")).unwrap()["A"]);

        ctl.capture_cycle(&mut TinySource).unwrap();
        assert!(ctl.can_compute(Some("A")).unwrap()["A"]);
        assert!(ctl.can_compute(None).unwrap()["B"]);
    }

    #[test]
    fn unknown_device_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), None).unwrap();
        assert!(matches!(
            ctl.can_compute(Some("Z")).unwrap_err(),
            SessionError::UnknownDevice(_)
        ));
        assert!(matches!(
            ctl.compute(Some("Z")).unwrap_err(),
            SessionError::UnknownDevice(_)
        ));
    }

    #[test]
    fn detection_miss_does_not_increment() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SessionConfig::new(dir.path());
        config.min_valid_frames = 3;
        let mut ctl = SessionController::new(config, NeverFound);
        ctl.start(&ids(&["A"]), None).unwrap();

        let report = ctl.capture_cycle(&mut TinySource).unwrap();
        assert!(!report.success);
        assert_eq!(report.devices["A"].status, CaptureStatus::PatternNotFound);
        assert_eq!(report.devices["A"].total, 0);
        assert_eq!(ctl.status().captured["A"], 0);
    }

    #[test]
    fn acquisition_failure_is_per_device_soft() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), None).unwrap();

        let report = ctl.capture_cycle(&mut DeadSource).unwrap();
        assert!(!report.success);
        assert_eq!(report.devices["A"].status, CaptureStatus::AcquisitionFailed);
        assert!(ctl.status().active);
    }

    #[test]
    fn compute_with_too_few_correspondences_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), None).unwrap();
        ctl.capture_cycle(&mut TinySource).unwrap();

        let report = ctl.compute(None).unwrap();
        assert!(!report.success);
        assert!(matches!(
            report.devices["A"].failure,
            Some(DeviceFailure::InsufficientCorrespondences { got: 1, need: 3 })
        ));
        assert!(report.devices["A"].result.is_none());
        assert!(ctl.status().active);
    }

    #[test]
    fn end_without_session_is_a_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        let report = ctl.end().unwrap();
        assert!(!report.success);
        assert!(report.info.is_none());
    }

    #[test]
    fn restart_after_end_yields_zeroed_counters() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), Some("one")).unwrap();
        for _ in 0..4 {
            ctl.capture_cycle(&mut TinySource).unwrap();
        }
        let report = ctl.end().unwrap();
        assert!(report.success);
        let final_info = report.info.unwrap();
        assert_eq!(final_info.total_captures["A"], 4);
        assert_eq!(final_info.status, SessionState::Completed);
        assert!(final_info.completed_at.is_some());

        let info = ctl.start(&ids(&["A"]), Some("two")).unwrap();
        assert_eq!(info.total_captures["A"], 0);
        assert!(!ctl.can_compute(None).unwrap()["A"]);
    }

    #[test]
    fn session_metadata_is_written_at_start_and_overwritten_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&dir, 3);
        ctl.start(&ids(&["A"]), Some("meta")).unwrap();

        let path = dir.path().join("meta").join(SESSION_INFO_FILE);
        let on_disk: SessionInfo =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.status, SessionState::Active);
        assert_eq!(on_disk.total_captures["A"], 0);

        ctl.capture_cycle(&mut TinySource).unwrap();
        ctl.end().unwrap();
        let on_disk: SessionInfo =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.status, SessionState::Completed);
        assert_eq!(on_disk.total_captures["A"], 1);
    }
}
