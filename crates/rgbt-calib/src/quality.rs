//! Quality scoring of a completed calibration.
//!
//! Classification is driven by the worst of the three RMS reprojection
//! errors; an absent error (a solve that never produced one) counts as
//! infinite. Thresholds are in the same units as the RMS errors.

use rgbt_calib_core::Real;
use serde::{Deserialize, Serialize};

/// Accuracy label, best to worst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

/// Worst-error thresholds for [`QualityLabel::Excellent`],
/// [`QualityLabel::Good`], and [`QualityLabel::Acceptable`]; anything at or
/// above the last is [`QualityLabel::Poor`].
pub const QUALITY_THRESHOLDS: [Real; 3] = [0.5, 1.0, 2.0];

/// Score plus the inputs it was derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub label: QualityLabel,
    pub rgb_error: Option<Real>,
    pub thermal_error: Option<Real>,
    pub stereo_error: Option<Real>,
    pub recommendations: Vec<String>,
}

/// Classify a calibration from its three RMS errors.
///
/// Pure and total: any combination of finite, infinite, or absent inputs
/// yields a label (absent and non-finite values can only lower it).
pub fn assess_quality(
    rgb_error: Option<Real>,
    thermal_error: Option<Real>,
    stereo_error: Option<Real>,
) -> QualityAssessment {
    let max_error = [rgb_error, thermal_error, stereo_error]
        .iter()
        .map(|e| e.unwrap_or(Real::INFINITY))
        .fold(Real::NEG_INFINITY, Real::max);

    let label = if max_error < QUALITY_THRESHOLDS[0] {
        QualityLabel::Excellent
    } else if max_error < QUALITY_THRESHOLDS[1] {
        QualityLabel::Good
    } else if max_error < QUALITY_THRESHOLDS[2] {
        QualityLabel::Acceptable
    } else {
        QualityLabel::Poor
    };

    let mut recommendations = Vec::new();
    if label >= QualityLabel::Acceptable {
        recommendations.push("Recapture some calibration images for better accuracy".to_owned());
    }
    if label == QualityLabel::Poor {
        recommendations
            .push("Verify the pattern is fully visible in both cameras".to_owned());
        recommendations.push("Improve lighting and thermal contrast on the pattern".to_owned());
    }

    QualityAssessment {
        label,
        rgb_error,
        thermal_error,
        stereo_error,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(rgb: Real, thermal: Real, stereo: Real) -> QualityLabel {
        assess_quality(Some(rgb), Some(thermal), Some(stereo)).label
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(label(0.1, 0.2, 0.49), QualityLabel::Excellent);
        assert_eq!(label(0.1, 0.2, 0.5), QualityLabel::Good);
        assert_eq!(label(0.1, 0.99, 0.2), QualityLabel::Good);
        assert_eq!(label(1.0, 0.1, 0.1), QualityLabel::Acceptable);
        assert_eq!(label(0.1, 1.99, 0.1), QualityLabel::Acceptable);
        assert_eq!(label(2.0, 0.1, 0.1), QualityLabel::Poor);
    }

    #[test]
    fn worst_error_dominates() {
        assert_eq!(label(0.1, 0.1, 5.0), QualityLabel::Poor);
        assert_eq!(label(5.0, 0.1, 0.1), QualityLabel::Poor);
    }

    #[test]
    fn absent_errors_are_infinite() {
        assert_eq!(assess_quality(Some(0.1), None, Some(0.1)).label, QualityLabel::Poor);
        assert_eq!(assess_quality(None, None, None).label, QualityLabel::Poor);
    }

    #[test]
    fn infinity_is_total() {
        let q = assess_quality(Some(Real::INFINITY), Some(0.1), Some(0.1));
        assert_eq!(q.label, QualityLabel::Poor);
        assert_eq!(q.recommendations.len(), 3);
    }

    #[test]
    fn classification_is_monotonic() {
        let errors = [0.0, 0.49, 0.5, 0.99, 1.0, 1.99, 2.0, 10.0, Real::INFINITY];
        let mut prev = QualityLabel::Excellent;
        for e in errors {
            let cur = label(e, 0.0, 0.0);
            assert!(cur >= prev, "label improved as error grew: {cur:?} after {prev:?}");
            prev = cur;
        }
    }

    #[test]
    fn assessment_echoes_inputs() {
        let q = assess_quality(Some(0.3), Some(0.7), None);
        assert_eq!(q.rgb_error, Some(0.3));
        assert_eq!(q.thermal_error, Some(0.7));
        assert_eq!(q.stereo_error, None);
    }
}
