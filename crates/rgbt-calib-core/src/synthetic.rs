//! Synthetic chessboard rendering.
//!
//! Renders an ideal checkerboard seen through a plane homography. Used by
//! detector tests and the end-to-end synthetic frame source; not part of
//! the calibration pipeline itself.

use crate::{GrayImage, Homography, PatternSpec, Pt2, Real};

/// Intensity of dark squares.
pub const DARK: u8 = 40;
/// Intensity of light squares.
pub const LIGHT: u8 = 220;
/// Intensity outside the board.
pub const BACKGROUND: u8 = 255;

/// Render the board through `h_img_from_board` (board millimeters to pixels).
///
/// The board's internal corner `(i, j)` sits at `(i * square, j * square)`;
/// squares extend one ring beyond the internal corner grid.
pub fn render_board(
    spec: &PatternSpec,
    h_img_from_board: &Homography,
    width: usize,
    height: usize,
) -> Option<GrayImage> {
    let inv = h_img_from_board.inverse()?;
    let s = spec.square_size;
    let x_min = -s;
    let x_max = spec.cols as Real * s;
    let y_min = -s;
    let y_max = spec.rows as Real * s;

    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let p = inv.apply(Pt2::new(x as Real + 0.5, y as Real + 0.5));
            let v = if p.x < x_min || p.x >= x_max || p.y < y_min || p.y >= y_max {
                BACKGROUND
            } else {
                let ci = (p.x / s).floor() as i64;
                let cj = (p.y / s).floor() as i64;
                if (ci + cj).rem_euclid(2) == 0 {
                    DARK
                } else {
                    LIGHT
                }
            };
            img.data[y * width + x] = v;
        }
    }
    Some(img)
}
