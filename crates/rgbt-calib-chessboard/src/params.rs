/// Tuning knobs for the chessboard corner detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChessboardParams {
    /// Ring radii (pixels) the saddle response is accumulated over.
    /// The largest radius must stay below half the projected square size.
    pub ring_radii: [usize; 2],
    /// Candidate threshold as a fraction of the global peak response.
    pub threshold_frac: f32,
    /// Absolute response floor; rejects blank or near-blank frames where
    /// the relative threshold would latch onto noise.
    pub min_peak: f32,
    /// Non-maximum suppression radius (pixels).
    pub nms_radius: usize,
    /// Maximum within-row vertical spread, as a fraction of the median
    /// row-to-row gap, accepted when validating the grid ordering.
    pub row_spread_frac: f32,
}

impl Default for ChessboardParams {
    fn default() -> Self {
        Self {
            ring_radii: [2, 3],
            threshold_frac: 0.4,
            min_peak: 80.0,
            nms_radius: 3,
            row_spread_frac: 0.7,
        }
    }
}
