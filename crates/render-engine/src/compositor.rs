//! Frame compositor: draws the estimated skeleton onto a frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use squatcount_pose_model::{BodyLandmark, PoseLandmarks};

/// Skeleton connections (start, end).
pub const SKELETON_CONNECTIONS: [(BodyLandmark, BodyLandmark); 16] = [
    // Face
    (BodyLandmark::LeftEar, BodyLandmark::LeftEye),
    (BodyLandmark::LeftEye, BodyLandmark::Nose),
    (BodyLandmark::Nose, BodyLandmark::RightEye),
    (BodyLandmark::RightEye, BodyLandmark::RightEar),
    // Upper body
    (BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder),
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftElbow),
    (BodyLandmark::LeftElbow, BodyLandmark::LeftWrist),
    (BodyLandmark::RightShoulder, BodyLandmark::RightElbow),
    (BodyLandmark::RightElbow, BodyLandmark::RightWrist),
    // Torso
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftHip),
    (BodyLandmark::RightShoulder, BodyLandmark::RightHip),
    (BodyLandmark::LeftHip, BodyLandmark::RightHip),
    // Lower body
    (BodyLandmark::LeftHip, BodyLandmark::LeftKnee),
    (BodyLandmark::LeftKnee, BodyLandmark::LeftAnkle),
    (BodyLandmark::RightHip, BodyLandmark::RightKnee),
    (BodyLandmark::RightKnee, BodyLandmark::RightAnkle),
];

/// Overlay style.
#[derive(Debug, Clone)]
pub struct SkeletonOverlay {
    pub landmark_color: Rgb<u8>,
    pub connection_color: Rgb<u8>,
    /// Color for landmarks below `min_visibility`.
    pub low_visibility_color: Rgb<u8>,
    pub min_visibility: f64,
    /// Landmark dot radius in pixels.
    pub radius: i32,
    /// Connection line thickness in pixels.
    pub thickness: u32,
}

impl Default for SkeletonOverlay {
    fn default() -> Self {
        Self {
            landmark_color: Rgb([0, 255, 0]),
            connection_color: Rgb([255, 255, 0]),
            low_visibility_color: Rgb([255, 0, 0]),
            min_visibility: 0.5,
            radius: 4,
            thickness: 2,
        }
    }
}

impl SkeletonOverlay {
    /// Draw connections first, then landmark dots on top.
    pub fn draw(&self, frame: &mut RgbImage, pose: &PoseLandmarks) {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        for (start, end) in SKELETON_CONNECTIONS {
            let (Some(a), Some(b)) = (pose.get(start), pose.get(end)) else {
                continue;
            };
            let from = a.to_pixel(width, height);
            let to = b.to_pixel(width, height);
            self.draw_thick_line(frame, from, to);
        }

        for (_, landmark) in pose.iter() {
            let (x, y) = landmark.to_pixel(width, height);
            let color = if landmark.is_visible(self.min_visibility) {
                self.landmark_color
            } else {
                self.low_visibility_color
            };
            draw_filled_circle_mut(frame, (x as i32, y as i32), self.radius, color);
        }
    }

    fn draw_thick_line(&self, frame: &mut RgbImage, from: (f32, f32), to: (f32, f32)) {
        let steps = self.thickness.max(1);
        for i in 0..steps {
            let offset = i as f32 - (steps / 2) as f32;
            // Offset perpendicular to the dominant axis of the segment.
            let (dx, dy) = if (to.0 - from.0).abs() >= (to.1 - from.1).abs() {
                (0.0, offset)
            } else {
                (offset, 0.0)
            };
            draw_line_segment_mut(
                frame,
                (from.0 + dx, from.1 + dy),
                (to.0 + dx, to.1 + dy),
                self.connection_color,
            );
        }
    }
}
