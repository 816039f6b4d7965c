//! Clock and sampling utilities for streaming sessions.
//!
//! Every streaming session is anchored to a monotonic clock epoch taken when
//! the session starts. This module provides:
//! - The session clock (monotonic elapsed time + wall-clock start)
//! - The frame sampler that throttles processing to a target rate

use std::time::{Duration, Instant};

/// A session clock that provides monotonic elapsed time relative to the
/// moment a session started.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Time elapsed since the session started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Seconds elapsed since the session started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Compute the frame-skip factor that keeps processing at or below
/// `target_fps` frames per second of source video.
///
/// `stride = max(1, floor(source_fps / target_fps))`. An unknown, zero,
/// negative or non-finite rate yields a stride of 1.
pub fn sampling_stride(source_fps: Option<f64>, target_fps: f64) -> u64 {
    let Some(fps) = source_fps.filter(|f| f.is_finite() && *f > 0.0) else {
        return 1;
    };
    if !target_fps.is_finite() || target_fps <= 0.0 {
        return 1;
    }
    ((fps / target_fps).floor() as u64).max(1)
}

/// Decides which frames of a sequential source get processed.
///
/// The frame counter advances on every read; a frame is sampled when the
/// advanced counter is a multiple of the stride.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    stride: u64,
}

impl FrameSampler {
    /// Create a sampler for a source with the given nominal rate.
    pub fn new(source_fps: Option<f64>, target_fps: f64) -> Self {
        Self::with_stride(sampling_stride(source_fps, target_fps))
    }

    /// Create a sampler with an explicit stride (clamped to at least 1).
    pub fn with_stride(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
        }
    }

    /// Whether the frame at `frame_index` (1-based) is sampled.
    pub fn is_sampled(&self, frame_index: u64) -> bool {
        frame_index % self.stride == 0
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}
