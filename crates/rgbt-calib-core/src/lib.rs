//! Core types and utilities for RGB-thermal camera calibration.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete corner detector or acquisition transport.

mod detect;
mod frame_quality;
mod homography;
mod image;
mod logger;
mod pattern;
pub mod synthetic;
mod types;

pub use detect::{PatternDetector, PatternObservation};
pub use frame_quality::{assess_frame, FrameQuality};
pub use homography::{estimate_homography, warp_perspective_gray, Homography};
pub use image::{
    rgb_to_luma, sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, RgbImage,
};
pub use pattern::PatternSpec;
pub use types::{from_homogeneous, to_homogeneous, Iso3, Mat3, Pt2, Pt3, Real, Vec2, Vec3};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
