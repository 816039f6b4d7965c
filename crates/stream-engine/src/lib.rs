//! SquatCount Stream Engine
//!
//! Runs one streaming session per client connection: frames are decoded
//! sequentially, throttled to the target rate, handed to the pose
//! collaborator, scored by the repetition machine, and pushed to the
//! client together with the running count.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    StreamSession                      │
//! │  ┌─────────────┐   ┌────────────────────────────────┐ │
//! │  │ FrameSource │──►│         FrameProcessor          │ │
//! │  │  (ffmpeg)   │   │  PoseEstimator ─► angle / view  │ │
//! │  └─────────────┘   │        ─► RepStateMachine       │ │
//! │     every Nth      │        ─► skeleton overlay      │ │
//! │       frame        └───────────────┬────────────────┘ │
//! │                                    ▼                  │
//! │                 FrameSink (JPEG + total_squats)       │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod estimator;
pub mod processor;
pub mod session;
pub mod source;

pub use estimator::{PoseEstimator, PoseService, ProcessPoseEstimator, TrackPoseEstimator};
pub use processor::{FrameProcessor, ProcessedFrame};
pub use session::*;
pub use source::{FfmpegFrameSource, FrameSource, SourceInfo, VideoFrame};
