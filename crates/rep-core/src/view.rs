//! Camera orientation heuristic.
//!
//! A subject facing the camera shows shoulders and hips of similar apparent
//! width, and both shoulder and knee pairs stacked within a narrow
//! horizontal band. Anything else is treated as a side view.

use serde::{Deserialize, Serialize};
use squatcount_pose_model::{BodyLandmark, Point2D, PoseLandmarks};

/// Empirically calibrated tolerance, in normalized frame units.
pub const DEFAULT_VIEW_TOLERANCE: f64 = 0.10;

/// Camera orientation relative to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Front,
    Side,
}

/// The six landmarks the classifier reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLandmarks {
    pub shoulder_left: Point2D,
    pub shoulder_right: Point2D,
    pub hip_left: Point2D,
    pub hip_right: Point2D,
    pub knee_left: Point2D,
    pub knee_right: Point2D,
}

impl ViewLandmarks {
    /// Extract the required points, or `None` if any is missing.
    pub fn from_pose(pose: &PoseLandmarks) -> Option<Self> {
        Some(Self {
            shoulder_left: pose.point(BodyLandmark::LeftShoulder)?,
            shoulder_right: pose.point(BodyLandmark::RightShoulder)?,
            hip_left: pose.point(BodyLandmark::LeftHip)?,
            hip_right: pose.point(BodyLandmark::RightHip)?,
            knee_left: pose.point(BodyLandmark::LeftKnee)?,
            knee_right: pose.point(BodyLandmark::RightKnee)?,
        })
    }
}

/// Pairwise widths measured across the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMeasurements {
    pub shoulder_distance: f64,
    pub hip_distance: f64,
    /// Reported for diagnostics; not part of the decision.
    pub knee_distance: f64,
    pub shoulder_dx: f64,
    pub knee_dx: f64,
}

/// Front/side view classifier.
#[derive(Debug, Clone)]
pub struct ViewClassifier {
    tolerance: f64,
}

impl Default for ViewClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_VIEW_TOLERANCE)
    }
}

impl ViewClassifier {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn measure(&self, lm: &ViewLandmarks) -> ViewMeasurements {
        ViewMeasurements {
            shoulder_distance: lm.shoulder_left.distance(&lm.shoulder_right),
            hip_distance: lm.hip_left.distance(&lm.hip_right),
            knee_distance: lm.knee_left.distance(&lm.knee_right),
            shoulder_dx: (lm.shoulder_left.x - lm.shoulder_right.x).abs(),
            knee_dx: (lm.knee_left.x - lm.knee_right.x).abs(),
        }
    }

    /// True when all three symmetry checks pass strictly within tolerance.
    pub fn is_front_view(&self, lm: &ViewLandmarks) -> bool {
        let m = self.measure(lm);
        (m.shoulder_distance - m.hip_distance).abs() < self.tolerance
            && m.shoulder_dx < self.tolerance
            && m.knee_dx < self.tolerance
    }

    pub fn classify(&self, lm: &ViewLandmarks) -> ViewMode {
        if self.is_front_view(lm) {
            ViewMode::Front
        } else {
            ViewMode::Side
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squatcount_pose_model::Landmark;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    /// Left/right pairs mirrored about x = 0.5, each pair 0.08 apart.
    fn symmetric() -> ViewLandmarks {
        ViewLandmarks {
            shoulder_left: p(0.54, 0.30),
            shoulder_right: p(0.46, 0.30),
            hip_left: p(0.535, 0.55),
            hip_right: p(0.465, 0.55),
            knee_left: p(0.53, 0.75),
            knee_right: p(0.47, 0.75),
        }
    }

    #[test]
    fn symmetric_pose_is_front_view() {
        let classifier = ViewClassifier::default();
        assert!(classifier.is_front_view(&symmetric()));
        assert_eq!(classifier.classify(&symmetric()), ViewMode::Front);
    }

    #[test]
    fn wide_shoulders_are_side_view() {
        let mut lm = symmetric();
        lm.shoulder_left.x = 0.60;
        lm.shoulder_right.x = 0.40;
        assert!(!ViewClassifier::default().is_front_view(&lm));
    }

    #[test]
    fn wide_knees_are_side_view() {
        let mut lm = symmetric();
        lm.knee_left.x = 0.62;
        lm.knee_right.x = 0.38;
        assert_eq!(ViewClassifier::default().classify(&lm), ViewMode::Side);
    }

    #[test]
    fn tolerance_is_strict() {
        // Exactly representable values so |dx| lands on the tolerance.
        let classifier = ViewClassifier::new(0.25);
        let mut lm = symmetric();
        lm.knee_left.x = 0.75;
        lm.knee_right.x = 0.5;
        assert!(!classifier.is_front_view(&lm));

        lm.knee_left.x = 0.625;
        assert!(classifier.is_front_view(&lm));
    }

    #[test]
    fn shoulder_hip_width_mismatch_is_side_view() {
        let mut lm = symmetric();
        lm.hip_left = p(0.50, 0.40);
        lm.hip_right = p(0.50, 0.60);
        let m = ViewClassifier::default().measure(&lm);
        assert!((m.hip_distance - 0.2).abs() < 1e-9);
        assert!(!ViewClassifier::default().is_front_view(&lm));
    }

    #[test]
    fn knee_distance_is_measured_but_not_decisive() {
        let lm = symmetric();
        let m = ViewClassifier::default().measure(&lm);
        assert!((m.knee_distance - 0.06).abs() < 1e-9);
    }

    #[test]
    fn extraction_requires_all_six_points() {
        let lm = symmetric();
        let mut pose = PoseLandmarks::new()
            .with(BodyLandmark::LeftShoulder, Landmark::new(lm.shoulder_left.x, lm.shoulder_left.y))
            .with(BodyLandmark::RightShoulder, Landmark::new(lm.shoulder_right.x, lm.shoulder_right.y))
            .with(BodyLandmark::LeftHip, Landmark::new(lm.hip_left.x, lm.hip_left.y))
            .with(BodyLandmark::RightHip, Landmark::new(lm.hip_right.x, lm.hip_right.y))
            .with(BodyLandmark::LeftKnee, Landmark::new(lm.knee_left.x, lm.knee_left.y));
        assert!(ViewLandmarks::from_pose(&pose).is_none());

        pose.insert(BodyLandmark::RightKnee, Landmark::new(lm.knee_right.x, lm.knee_right.y));
        assert_eq!(ViewLandmarks::from_pose(&pose), Some(lm));
    }
}
