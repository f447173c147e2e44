//! Plain chessboard corner detector for the RGB-thermal calibration engine.
//!
//! Both modalities run the same detector, so point ordering is identical by
//! construction and frames can be matched corner-for-corner.
//!
//! Algorithm:
//! 1. Compute a saddle-point response at every interior pixel by sampling
//!    diagonal and axis-aligned pairs on small rings; checker corners score
//!    high, edges and flat regions near zero.
//! 2. Threshold relative to the global peak and apply non-maximum
//!    suppression.
//! 3. Refine each peak to subpixel precision with a 3x3 response centroid.
//! 4. Order the peaks row-major to match the board's object points; fail
//!    unless exactly `cols * rows` corners survive and form coherent rows.
//!
//! The detector is a pure function of the image bytes and the pattern
//! geometry, so repeated runs always produce the same observation.

mod detector;
mod params;
mod response;

pub use detector::ChessboardDetector;
pub use params::ChessboardParams;
