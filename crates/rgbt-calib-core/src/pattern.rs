use crate::{Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Planar calibration pattern geometry: a grid of internal chessboard
/// corners with a known physical square size.
///
/// Fixed for the lifetime of a calibration session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Internal corners along the board's x axis.
    pub cols: usize,
    /// Internal corners along the board's y axis.
    pub rows: usize,
    /// Physical square edge length (length units, millimeters by convention).
    pub square_size: Real,
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            cols: 9,
            rows: 6,
            square_size: 25.0,
        }
    }
}

impl PatternSpec {
    pub fn new(cols: usize, rows: usize, square_size: Real) -> Self {
        Self {
            cols,
            rows,
            square_size,
        }
    }

    /// Total number of internal corners.
    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }

    /// 3D object points on the `Z = 0` board plane, row-major
    /// (left-to-right, top-to-bottom), matching detector point ordering.
    pub fn object_points(&self) -> Vec<Pt3> {
        let mut pts = Vec::with_capacity(self.corner_count());
        for j in 0..self.rows {
            for i in 0..self.cols {
                pts.push(Pt3::new(
                    i as Real * self.square_size,
                    j as Real * self.square_size,
                    0.0,
                ));
            }
        }
        pts
    }

    /// Same grid as [`object_points`](Self::object_points) restricted to the
    /// board plane, as used by plane-homography solvers.
    pub fn board_points(&self) -> Vec<Pt2> {
        self.object_points()
            .iter()
            .map(|p| Pt2::new(p.x, p.y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_nine_by_six() {
        let spec = PatternSpec::default();
        assert_eq!(spec.cols, 9);
        assert_eq!(spec.rows, 6);
        assert_eq!(spec.corner_count(), 54);
        assert!((spec.square_size - 25.0).abs() < 1e-12);
    }

    #[test]
    fn object_points_are_row_major_on_z0() {
        let spec = PatternSpec::new(3, 2, 10.0);
        let pts = spec.object_points();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(20.0, 0.0, 0.0));
        assert_eq!(pts[3], Pt3::new(0.0, 10.0, 0.0));
        assert!(pts.iter().all(|p| p.z == 0.0));
    }
}
