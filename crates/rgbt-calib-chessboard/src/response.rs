use rgbt_calib_core::GrayImageView;

#[inline]
fn px(img: &GrayImageView<'_>, x: usize, y: usize) -> f32 {
    img.data[y * img.width + x] as f32
}

/// Saddle response from two opposing sample pairs.
///
/// For a checker corner the two pairs see opposite colors, so the summed
/// term is large while both difference terms vanish. Straight edges leave
/// the summed term near zero, flat regions leave everything near zero.
#[inline]
fn pair_response(a: f32, b: f32, c: f32, d: f32) -> f32 {
    ((a + b - c - d).abs() - (a - b).abs() - (c - d).abs()).max(0.0)
}

/// Per-pixel corner response accumulated over the configured ring radii.
///
/// Pixels closer than the largest radius to the border get response 0.
pub(crate) fn corner_response(img: &GrayImageView<'_>, radii: &[usize; 2]) -> Vec<f32> {
    let w = img.width;
    let h = img.height;
    let mut resp = vec![0.0f32; w * h];
    let margin = radii[0].max(radii[1]);
    if w <= 2 * margin || h <= 2 * margin {
        return resp;
    }

    for y in margin..h - margin {
        for x in margin..w - margin {
            let mut acc = 0.0f32;
            for &d in radii {
                // Diagonal quadrants (axis-aligned checker edges).
                let diag = pair_response(
                    px(img, x - d, y - d),
                    px(img, x + d, y + d),
                    px(img, x + d, y - d),
                    px(img, x - d, y + d),
                );
                // Axis samples (diagonal checker edges).
                let axis = pair_response(
                    px(img, x, y - d),
                    px(img, x, y + d),
                    px(img, x - d, y),
                    px(img, x + d, y),
                );
                acc += diag.max(axis);
            }
            resp[y * w + x] = acc;
        }
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgbt_calib_core::GrayImage;

    fn quad_image(tl: u8, tr: u8, bl: u8, br: u8) -> GrayImage {
        let mut img = GrayImage::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                img.data[y * 16 + x] = match (x < 8, y < 8) {
                    (true, true) => tl,
                    (false, true) => tr,
                    (true, false) => bl,
                    (false, false) => br,
                };
            }
        }
        img
    }

    #[test]
    fn checker_corner_beats_edge_and_flat() {
        let corner = quad_image(220, 40, 40, 220);
        let edge = quad_image(220, 40, 220, 40);
        let flat = quad_image(128, 128, 128, 128);

        let radii = [2, 3];
        let rc = corner_response(&corner.view(), &radii);
        let re = corner_response(&edge.view(), &radii);
        let rf = corner_response(&flat.view(), &radii);

        // The saddle point sits at (8, 8); sample just inside each quadrant.
        let center = 8 * 16 + 8;
        assert!(rc[center] > 500.0, "corner response {}", rc[center]);
        assert!(re[center] < 1.0, "edge response {}", re[center]);
        assert!(rf[center] < 1.0, "flat response {}", rf[center]);
    }

    #[test]
    fn border_margin_is_zeroed() {
        let img = quad_image(220, 40, 40, 220);
        let resp = corner_response(&img.view(), &[2, 3]);
        assert_eq!(resp[0], 0.0);
        assert_eq!(resp[16 + 1], 0.0);
    }
}
