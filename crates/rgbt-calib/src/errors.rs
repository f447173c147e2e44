//! Error taxonomy of the calibration engine.
//!
//! Session-level errors abort the call that raised them and leave the
//! session untouched. Per-device failures are collected into the report of
//! the multi-device operation and never abort sibling devices.

use thiserror::Error;

use crate::capture::Modality;
use rgbt_calib_solve::SolveError;

/// Persistence failures (session metadata and result files).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that fail an engine call outright.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session is already active; `end` it first.
    #[error("a calibration session is already active")]
    SessionConflict,
    /// Capture or compute was requested with no session running.
    #[error("no active calibration session")]
    NoActiveSession,
    /// `start` was called with an empty device id set.
    #[error("device id set is empty")]
    NoDevices,
    /// A device id that is not part of the active session.
    #[error("unknown device id {0:?}")]
    UnknownDevice(String),
    #[error("failed to persist session state: {0}")]
    Persistence(#[from] StoreError),
}

/// Per-device failure recorded in a compute report.
#[derive(Debug, Error)]
pub enum DeviceFailure {
    /// Not enough dual-modality detections for this device.
    #[error("only {got} valid correspondences, need {need}")]
    InsufficientCorrespondences { got: usize, need: usize },
    /// One modality's intrinsic solve failed; the other may still have
    /// produced parameters.
    #[error("{modality} intrinsic solve failed: {source}")]
    Intrinsics {
        modality: Modality,
        source: SolveError,
    },
    #[error("stereo solve failed: {0}")]
    Stereo(SolveError),
    /// The overlay homography could not be estimated from the
    /// representative view.
    #[error("overlay homography estimation failed")]
    HomographyFailed,
    #[error("failed to persist calibration result: {0}")]
    Persistence(#[from] StoreError),
}
