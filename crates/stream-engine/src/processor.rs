//! Per-frame analysis: landmarks → angle and view → repetition machine.

use std::sync::Arc;

use image::RgbImage;
use squatcount_common::error::SquatResult;
use squatcount_pose_model::{BodyLandmark, PoseLandmarks};
use squatcount_render_engine::SkeletonOverlay;
use squatcount_rep_core::{
    joint_angle, RepMemory, RepObservation, RepStateMachine, ViewClassifier, ViewLandmarks,
    ViewMode,
};

use crate::estimator::PoseEstimator;
use crate::source::VideoFrame;

/// Result of processing one sampled frame.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub index: u64,
    /// The frame with the skeleton drawn on it, when landmarks were found.
    pub image: RgbImage,
    pub rep_completed: bool,
    /// Left hip/knee/ankle angle in degrees.
    pub angle: Option<f64>,
    pub view: Option<ViewMode>,
    /// Machine memory to carry into the next sampled frame.
    pub memory: RepMemory,
}

pub struct FrameProcessor {
    estimator: Arc<dyn PoseEstimator>,
    classifier: ViewClassifier,
    machine: RepStateMachine,
    overlay: SkeletonOverlay,
}

impl FrameProcessor {
    pub fn new(estimator: Arc<dyn PoseEstimator>) -> Self {
        Self {
            estimator,
            classifier: ViewClassifier::default(),
            machine: RepStateMachine::default(),
            overlay: SkeletonOverlay::default(),
        }
    }

    pub fn estimator_name(&self) -> &str {
        self.estimator.name()
    }

    /// Analyze one frame.
    ///
    /// Frame-local estimator failures are downgraded to a miss; anything else
    /// is returned to the caller.
    pub async fn process(&self, frame: VideoFrame, memory: RepMemory) -> SquatResult<ProcessedFrame> {
        let landmarks = match self.estimator.estimate(&frame).await {
            Ok(landmarks) => landmarks,
            Err(err) if err.is_frame_local() => {
                tracing::warn!(frame = frame.index, error = %err, "Pose estimation failed, treating frame as a miss");
                None
            }
            Err(err) => return Err(err),
        };

        let VideoFrame { index, mut image } = frame;
        let (observation, view) = match landmarks.as_ref() {
            Some(pose) => {
                self.overlay.draw(&mut image, pose);
                self.observe(pose)
            }
            None => (None, None),
        };

        let outcome = self.machine.advance(memory, observation);
        tracing::trace!(
            frame = index,
            angle = ?outcome.angle,
            ?view,
            phase = ?outcome.memory.phase,
            "Frame processed"
        );

        Ok(ProcessedFrame {
            index,
            image,
            rep_completed: outcome.rep_completed,
            angle: outcome.angle,
            view,
            memory: outcome.memory,
        })
    }

    /// The angle alone makes an observation. Front view needs both sides of
    /// the body, so a pose the classifier cannot read is observed as side view.
    fn observe(&self, pose: &PoseLandmarks) -> (Option<RepObservation>, Option<ViewMode>) {
        let view = ViewLandmarks::from_pose(pose).map(|lm| self.classifier.classify(&lm));
        let angle = match (
            pose.point(BodyLandmark::LeftHip),
            pose.point(BodyLandmark::LeftKnee),
            pose.point(BodyLandmark::LeftAnkle),
        ) {
            (Some(hip), Some(knee), Some(ankle)) => joint_angle(hip, knee, ankle),
            _ => None,
        };

        let observation = angle.map(|angle| RepObservation {
            angle,
            front_view: view == Some(ViewMode::Front),
        });
        (observation, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squatcount_common::error::SquatError;
    use squatcount_pose_model::Landmark;
    use squatcount_rep_core::RepPhase;

    /// Replies with a fixed result for every frame.
    struct Fixed(fn() -> SquatResult<Option<PoseLandmarks>>);

    #[async_trait::async_trait]
    impl PoseEstimator for Fixed {
        async fn estimate(&self, _frame: &VideoFrame) -> SquatResult<Option<PoseLandmarks>> {
            (self.0)()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Side-view leg bent to about 90 degrees.
    fn bent_leg() -> PoseLandmarks {
        PoseLandmarks::new()
            .with(BodyLandmark::LeftShoulder, Landmark::new(0.7, 0.2))
            .with(BodyLandmark::RightShoulder, Landmark::new(0.3, 0.2))
            .with(BodyLandmark::LeftHip, Landmark::new(0.3, 0.6))
            .with(BodyLandmark::RightHip, Landmark::new(0.32, 0.6))
            .with(BodyLandmark::LeftKnee, Landmark::new(0.5, 0.6))
            .with(BodyLandmark::RightKnee, Landmark::new(0.52, 0.6))
            .with(BodyLandmark::LeftAnkle, Landmark::new(0.5, 0.9))
    }

    fn frame() -> VideoFrame {
        VideoFrame {
            index: 1,
            image: RgbImage::new(64, 64),
        }
    }

    fn primed() -> RepMemory {
        RepMemory {
            previous_angle: Some(120.0),
            phase: RepPhase::Standing,
        }
    }

    #[tokio::test]
    async fn detection_feeds_the_machine() {
        let processor = FrameProcessor::new(Arc::new(Fixed(|| Ok(Some(bent_leg())))));
        let out = processor.process(frame(), primed()).await.unwrap();

        assert!((out.angle.unwrap() - 90.0).abs() < 1e-6);
        assert_eq!(out.view, Some(ViewMode::Side));
        assert_eq!(out.memory.phase, RepPhase::InSquat);
        assert!(!out.rep_completed);
        assert!(out.image.pixels().any(|p| p.0 != [0, 0, 0]));
    }

    #[tokio::test]
    async fn no_person_is_a_miss() {
        let processor = FrameProcessor::new(Arc::new(Fixed(|| Ok(None))));
        let out = processor.process(frame(), primed()).await.unwrap();

        assert_eq!(out.angle, None);
        assert_eq!(out.view, None);
        assert_eq!(out.memory.previous_angle, None);
        assert!(out.image.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[tokio::test]
    async fn missing_ankle_is_a_miss_but_still_drawn() {
        let processor = FrameProcessor::new(Arc::new(Fixed(|| {
            let mut pose = PoseLandmarks::new();
            for (name, lm) in bent_leg().iter() {
                if name != BodyLandmark::LeftAnkle {
                    pose.insert(name, *lm);
                }
            }
            Ok(Some(pose))
        })));
        let out = processor.process(frame(), primed()).await.unwrap();

        assert_eq!(out.angle, None);
        assert_eq!(out.view, Some(ViewMode::Side));
        assert_eq!(out.memory.previous_angle, None);
        assert!(out.image.pixels().any(|p| p.0 != [0, 0, 0]));
    }

    #[tokio::test]
    async fn unclassified_view_still_counts_the_angle() {
        let processor = FrameProcessor::new(Arc::new(Fixed(|| {
            let mut pose = PoseLandmarks::new();
            for (name, lm) in bent_leg().iter() {
                if name != BodyLandmark::RightShoulder {
                    pose.insert(name, *lm);
                }
            }
            Ok(Some(pose))
        })));
        let out = processor.process(frame(), primed()).await.unwrap();

        assert!((out.angle.unwrap() - 90.0).abs() < 1e-6);
        assert_eq!(out.view, None);
        assert_eq!(out.memory.previous_angle, out.angle);
        assert_eq!(out.memory.phase, RepPhase::InSquat);
    }

    #[tokio::test]
    async fn frame_local_failure_is_a_miss() {
        let processor = FrameProcessor::new(Arc::new(Fixed(|| Err(SquatError::pose("blurry")))));
        let out = processor.process(frame(), primed()).await.unwrap();
        assert_eq!(out.memory.previous_angle, None);
    }

    #[tokio::test]
    async fn unavailable_estimator_is_an_error() {
        let processor =
            FrameProcessor::new(Arc::new(Fixed(|| Err(SquatError::pose_unavailable("gone")))));
        let result = processor.process(frame(), primed()).await;
        assert!(matches!(result, Err(SquatError::PoseUnavailable { .. })));
    }
}
