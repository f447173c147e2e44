//! RGB-thermal camera calibration engine.
//!
//! Coordinates geometric calibration between a visible-light camera and a
//! co-located thermal camera on each of several capture devices, so thermal
//! imagery can later be warped into RGB pixel space for overlay.
//!
//! ## Quickstart
//!
//! ```no_run
//! use rgbt_calib::{SessionConfig, SessionController};
//! use rgbt_calib::chessboard::ChessboardDetector;
//! use rgbt_calib::synthetic::SyntheticRig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("calib-out");
//! let mut engine = SessionController::new(config, ChessboardDetector::default());
//! let mut source = SyntheticRig::new(Default::default(), 12);
//!
//! engine.start(&["cam0".to_string()], None)?;
//! for _ in 0..12 {
//!     engine.capture_cycle(&mut source)?;
//! }
//! let report = engine.compute(None)?;
//! println!("calibrated: {}", report.success);
//! engine.end()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`session`]: session lifecycle, capture gating, compute orchestration.
//! - [`capture`]: the [`FrameSource`] acquisition contract and frame types.
//! - [`quality`]: RMS-error based quality classification.
//! - [`result`]: persisted per-device calibration results.
//! - [`overlay`]: thermal-on-RGB warp, pseudo-color, and blending.
//! - [`synthetic`]: a synthetic two-camera rig for demos and tests.
//! - `rgbt_calib::core` / `chessboard` / `solve`: re-exported member crates.

pub use rgbt_calib_chessboard as chessboard;
pub use rgbt_calib_core as core;
pub use rgbt_calib_solve as solve;

pub mod capture;
pub mod errors;
pub mod overlay;
pub mod quality;
pub mod result;
pub mod session;
pub mod synthetic;

pub use capture::{FramePair, FrameSource, Modality};
pub use errors::{DeviceFailure, SessionError, StoreError};
pub use overlay::{apply_overlay, DEFAULT_ALPHA};
pub use quality::{assess_quality, QualityAssessment, QualityLabel};
pub use result::CalibrationResult;
pub use session::{
    CaptureReport, CaptureStatus, ComputeReport, EndReport, SessionConfig, SessionController,
    SessionInfo, SessionState, StatusSnapshot,
};
