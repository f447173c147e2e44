use log::debug;
use rgbt_calib_core::{GrayImageView, PatternDetector, PatternObservation, PatternSpec, Pt2, Real};

use crate::params::ChessboardParams;
use crate::response::corner_response;

/// Chessboard corner detector.
///
/// Deterministic: the same image and geometry always produce the same
/// observation, including point ordering.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChessboardDetector {
    params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(params: ChessboardParams) -> Self {
        Self { params }
    }
}

/// Thresholded non-maximum suppression with subpixel centroid refinement.
///
/// Ties inside the suppression window are broken by scan order, keeping the
/// first pixel, so the peak set is stable.
fn find_peaks(resp: &[f32], width: usize, height: usize, params: &ChessboardParams) -> Vec<Pt2> {
    let peak = resp.iter().cloned().fold(0.0f32, f32::max);
    if peak < params.min_peak {
        return Vec::new();
    }
    let thr = peak * params.threshold_frac;
    let r = params.nms_radius as i64;

    let mut out = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let v = resp[y * width + x];
            if v < thr {
                continue;
            }

            let idx = y * width + x;
            let mut is_max = true;
            'window: for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let nidx = ny as usize * width + nx as usize;
                    let q = resp[nidx];
                    if q > v || (q == v && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if !is_max {
                continue;
            }

            // 3x3 response centroid, then shift into continuous pixel
            // coordinates (pixel centers at integer + 0.5).
            let mut sx = 0.0f64;
            let mut sy = 0.0f64;
            let mut sw = 0.0f64;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let w = resp[ny as usize * width + nx as usize] as f64;
                    sx += w * nx as f64;
                    sy += w * ny as f64;
                    sw += w;
                }
            }
            if sw > 0.0 {
                out.push(Pt2::new(sx / sw + 0.5, sy / sw + 0.5));
            } else {
                out.push(Pt2::new(x as Real + 0.5, y as Real + 0.5));
            }
        }
    }
    out
}

/// Order corners row-major (top-to-bottom, left-to-right).
///
/// Requires exactly `cols * rows` corners forming coherent rows: the
/// vertical spread inside each row must stay well below the row-to-row gap.
fn order_grid(
    mut corners: Vec<Pt2>,
    cols: usize,
    rows: usize,
    row_spread_frac: f32,
) -> Option<Vec<Pt2>> {
    if corners.len() != cols * rows || cols == 0 || rows == 0 {
        return None;
    }

    corners.sort_by(|a, b| a.y.total_cmp(&b.y));

    let chunks: Vec<&[Pt2]> = corners.chunks(cols).collect();
    let means: Vec<Real> = chunks
        .iter()
        .map(|c| c.iter().map(|p| p.y).sum::<Real>() / cols as Real)
        .collect();

    if rows > 1 {
        let mut gaps: Vec<Real> = means.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.sort_by(Real::total_cmp);
        let median_gap = gaps[gaps.len() / 2];
        if median_gap <= 0.0 {
            return None;
        }
        for chunk in &chunks {
            let min = chunk.iter().map(|p| p.y).fold(Real::INFINITY, Real::min);
            let max = chunk
                .iter()
                .map(|p| p.y)
                .fold(Real::NEG_INFINITY, Real::max);
            if max - min > row_spread_frac as Real * median_gap {
                return None;
            }
        }
    }

    let mut ordered = Vec::with_capacity(corners.len());
    for chunk in chunks {
        let mut row = chunk.to_vec();
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        ordered.extend(row);
    }
    Some(ordered)
}

impl PatternDetector for ChessboardDetector {
    fn detect(&self, image: &GrayImageView<'_>, spec: &PatternSpec) -> PatternObservation {
        let expected = spec.corner_count();
        if expected == 0 {
            return PatternObservation::NotFound;
        }

        let resp = corner_response(image, &self.params.ring_radii);
        let peaks = find_peaks(&resp, image.width, image.height, &self.params);
        if peaks.len() != expected {
            debug!(
                "chessboard: {} candidate corners, expected {}",
                peaks.len(),
                expected
            );
            return PatternObservation::NotFound;
        }

        match order_grid(peaks, spec.cols, spec.rows, self.params.row_spread_frac) {
            Some(pts) => PatternObservation::Found(pts),
            None => {
                debug!("chessboard: corner set does not form a coherent grid");
                PatternObservation::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Vector3};
    use rgbt_calib_core::synthetic::render_board;
    use rgbt_calib_core::{GrayImage, Homography, Mat3};

    fn detect(img: &GrayImage, spec: &PatternSpec) -> PatternObservation {
        ChessboardDetector::default().detect(&img.view(), spec)
    }

    fn assert_matches_projection(obs: &PatternObservation, spec: &PatternSpec, h: &Homography) {
        let pts = obs.points().expect("pattern detected");
        assert_eq!(pts.len(), spec.corner_count());
        for (p, b) in pts.iter().zip(spec.board_points()) {
            let gt = h.apply(b);
            let err = ((p.x - gt.x).powi(2) + (p.y - gt.y).powi(2)).sqrt();
            assert!(err < 2.0, "corner off by {err:.2} px: {p:?} vs {gt:?}");
        }
    }

    #[test]
    fn detects_fronto_parallel_board() {
        let spec = PatternSpec::default();
        let h = Homography::new(Mat3::new(
            0.6, 0.0, 80.0, //
            0.0, 0.6, 80.0, //
            0.0, 0.0, 1.0,
        ));
        let img = render_board(&spec, &h, 320, 240).expect("render");
        let obs = detect(&img, &spec);
        assert_matches_projection(&obs, &spec, &h);
    }

    #[test]
    fn detects_tilted_board() {
        let spec = PatternSpec::default();

        // H = K [r1 r2 t], board centered on the optical axis at 900 mm.
        let k = Mat3::new(600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0);
        let rot = Rotation3::from_euler_angles(0.15, -0.1, 0.03);
        let center = Vector3::new(100.0, 62.5, 0.0);
        let t = Vector3::new(0.0, 0.0, 900.0) - rot * center;

        let r = rot.matrix();
        let mut h = Mat3::zeros();
        h.set_column(0, &(k * r.column(0)));
        h.set_column(1, &(k * r.column(1)));
        h.set_column(2, &(k * t));
        let h = Homography::new(h);

        let img = render_board(&spec, &h, 640, 480).expect("render");
        let obs = detect(&img, &spec);
        assert_matches_projection(&obs, &spec, &h);
    }

    #[test]
    fn ordering_is_row_major() {
        let spec = PatternSpec::new(4, 3, 25.0);
        let h = Homography::new(Mat3::new(
            1.0, 0.0, 60.0, //
            0.0, 1.0, 60.0, //
            0.0, 0.0, 1.0,
        ));
        let img = render_board(&spec, &h, 240, 200).expect("render");
        let obs = detect(&img, &spec);
        let pts = obs.points().expect("pattern detected");

        // First corner is top-left, x increases within each row.
        for row in pts.chunks(4) {
            for pair in row.windows(2) {
                assert!(pair[0].x < pair[1].x);
            }
        }
        assert!(pts[0].y < pts[8].y);
    }

    #[test]
    fn blank_frame_is_rejected() {
        let spec = PatternSpec::default();
        let img = GrayImage {
            width: 320,
            height: 240,
            data: vec![128; 320 * 240],
        };
        assert_eq!(detect(&img, &spec), PatternObservation::NotFound);
    }

    #[test]
    fn wrong_geometry_is_rejected() {
        let board = PatternSpec::new(5, 4, 25.0);
        let h = Homography::new(Mat3::new(
            1.0, 0.0, 60.0, //
            0.0, 1.0, 60.0, //
            0.0, 0.0, 1.0,
        ));
        let img = render_board(&board, &h, 240, 200).expect("render");
        let asked = PatternSpec::default(); // 9x6, board is 5x4
        assert_eq!(detect(&img, &asked), PatternObservation::NotFound);
    }

    #[test]
    fn detection_is_deterministic() {
        let spec = PatternSpec::default();
        let h = Homography::new(Mat3::new(
            0.6, 0.0, 80.0, //
            0.0, 0.6, 80.0, //
            0.0, 0.0, 1.0,
        ));
        let img = render_board(&spec, &h, 320, 240).expect("render");
        let a = detect(&img, &spec);
        let b = detect(&img, &spec);
        assert_eq!(a, b);
        assert!(a.is_found());
    }
}
