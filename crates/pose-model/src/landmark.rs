//! Landmark types produced by the pose-estimation collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A single estimated anatomical point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized X coordinate (0.0 = left edge).
    pub x: f64,
    /// Normalized Y coordinate (0.0 = top edge).
    pub y: f64,
    /// Visibility / confidence in `[0.0, 1.0]`, when the model reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Whether the landmark meets a visibility threshold. Landmarks
    /// without a score are considered visible.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility.map_or(true, |v| v >= threshold)
    }

    /// Convert to pixel coordinates for a frame of the given size.
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        ((self.x * width as f64) as f32, (self.y * height as f64) as f32)
    }
}

/// The 17 named body landmarks (COCO topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyLandmark {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// Landmarks estimated for at most one person in a frame.
///
/// Any subset of [`BodyLandmark`] may be present; models routinely drop
/// points that are out of frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseLandmarks {
    points: BTreeMap<BodyLandmark, Landmark>,
}

impl PoseLandmarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: BodyLandmark, landmark: Landmark) -> &mut Self {
        self.points.insert(name, landmark);
        self
    }

    pub fn with(mut self, name: BodyLandmark, landmark: Landmark) -> Self {
        self.points.insert(name, landmark);
        self
    }

    pub fn get(&self, name: BodyLandmark) -> Option<&Landmark> {
        self.points.get(&name)
    }

    pub fn point(&self, name: BodyLandmark) -> Option<Point2D> {
        self.get(name).map(Landmark::point)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyLandmark, &Landmark)> {
        self.points.iter().map(|(name, lm)| (*name, lm))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_visibility() {
        assert!(Landmark::new(0.1, 0.2).is_visible(0.9));
        assert!(Landmark::with_visibility(0.1, 0.2, 0.7).is_visible(0.5));
        assert!(!Landmark::with_visibility(0.1, 0.2, 0.3).is_visible(0.5));
    }

    #[test]
    fn test_landmark_to_pixel() {
        let (px, py) = Landmark::new(0.5, 0.25).to_pixel(640, 480);
        assert_eq!(px, 320.0);
        assert_eq!(py, 120.0);
    }

    #[test]
    fn test_pose_json_uses_snake_case_names() {
        let pose = PoseLandmarks::new()
            .with(BodyLandmark::LeftHip, Landmark::new(0.4, 0.5))
            .with(BodyLandmark::LeftKnee, Landmark::with_visibility(0.4, 0.7, 0.9));
        let json = serde_json::to_string(&pose).unwrap();
        assert!(json.contains("\"left_hip\":{\"x\":0.4,\"y\":0.5}"));

        let parsed: PoseLandmarks = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pose);
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
    }
}
