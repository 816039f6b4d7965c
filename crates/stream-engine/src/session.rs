//! Streaming session management.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use squatcount_common::clock::{FrameSampler, SessionClock};
use squatcount_common::config::StreamConfig;
use squatcount_common::error::SquatResult;
use squatcount_render_engine::encode_jpeg;
use squatcount_rep_core::{RepMemory, RepPhase};

use crate::processor::{FrameProcessor, ProcessedFrame};
use crate::source::{FrameSource, VideoFrame};

/// Mutable state of one session. Never shared between sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionState {
    /// Angle of the last sampled frame, cleared when it had no detection.
    pub previous_angle: Option<f64>,
    pub phase: RepPhase,
    /// Repetitions counted so far. Never decreases.
    pub total_count: u64,
    /// Frames read from the source, sampled or not.
    pub frame_index: u64,
}

impl SessionState {
    pub fn memory(&self) -> RepMemory {
        RepMemory {
            previous_angle: self.previous_angle,
            phase: self.phase,
        }
    }

    /// Count a frame read and return its 1-based index.
    pub fn advance_frame(&mut self) -> u64 {
        self.frame_index += 1;
        self.frame_index
    }

    /// Fold a processed frame into the state.
    pub fn apply(&mut self, frame: &ProcessedFrame) {
        self.previous_angle = frame.memory.previous_angle;
        self.phase = frame.memory.phase;
        if frame.rep_completed {
            self.total_count += 1;
        }
    }
}

/// Receives the results of a session, one call per sampled frame.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    /// Deliver an encoded frame followed by the running count.
    async fn emit(&mut self, jpeg: Vec<u8>, total_count: u64) -> SquatResult<()>;
}

/// Per-session tuning taken from [`StreamConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub target_fps: f64,
    pub jpeg_quality: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for SessionSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            target_fps: config.target_fps,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub total_count: u64,
    pub stride: u64,
    pub elapsed: Duration,
    /// The session ended because the stop flag was raised.
    pub stopped: bool,
}

/// Drives one frame source through the processor into a sink.
pub struct StreamSession {
    id: String,
    processor: FrameProcessor,
    settings: SessionSettings,
    stop_flag: Arc<AtomicBool>,
}

impl StreamSession {
    pub fn new(id: impl Into<String>, processor: FrameProcessor, settings: SessionSettings) -> Self {
        Self {
            id: id.into(),
            processor,
            settings,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flag that ends the session before its next frame read when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Stream `source` to `sink` until the source is exhausted, the stop
    /// flag is raised, or an error occurs.
    ///
    /// The source is released exactly once on every path.
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> SquatResult<SessionSummary>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let clock = SessionClock::start();
        let info = source.info();
        let sampler = FrameSampler::new(info.fps, self.settings.target_fps);

        tracing::info!(
            session = %self.id,
            epoch_wall = %clock.epoch_wall(),
            width = info.width,
            height = info.height,
            fps = ?info.fps,
            stride = sampler.stride(),
            estimator = self.processor.estimator_name(),
            "Streaming session started"
        );

        let mut state = SessionState::default();
        let mut frames_sampled = 0u64;
        let result = self
            .drive(source, sink, &sampler, &mut state, &mut frames_sampled)
            .await;
        let released = source.release().await;

        let stopped = match (result, released) {
            (Ok(stopped), Ok(())) => stopped,
            (Ok(_), Err(err)) => {
                tracing::error!(session = %self.id, error = %err, "Failed to release frame source");
                return Err(err);
            }
            (Err(err), released) => {
                if let Err(release_err) = released {
                    tracing::warn!(session = %self.id, error = %release_err, "Failed to release frame source");
                }
                tracing::error!(
                    session = %self.id,
                    frame = state.frame_index,
                    total = state.total_count,
                    error = %err,
                    "Streaming session failed"
                );
                return Err(err);
            }
        };

        let summary = SessionSummary {
            frames_read: state.frame_index,
            frames_sampled,
            total_count: state.total_count,
            stride: sampler.stride(),
            elapsed: clock.elapsed(),
            stopped,
        };
        tracing::info!(
            session = %self.id,
            frames_read = summary.frames_read,
            frames_sampled = summary.frames_sampled,
            total = summary.total_count,
            stopped,
            elapsed_secs = clock.elapsed_secs(),
            "Streaming session finished"
        );
        Ok(summary)
    }

    /// Returns whether the loop ended on the stop flag.
    async fn drive<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        sampler: &FrameSampler,
        state: &mut SessionState,
        frames_sampled: &mut u64,
    ) -> SquatResult<bool>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                tracing::info!(session = %self.id, frame = state.frame_index, "Stop requested");
                return Ok(true);
            }

            let Some(image) = source.read_frame().await? else {
                return Ok(false);
            };
            let index = state.advance_frame();
            if !sampler.is_sampled(index) {
                continue;
            }

            let processed = self
                .processor
                .process(VideoFrame { index, image }, state.memory())
                .await?;
            state.apply(&processed);
            *frames_sampled += 1;

            if processed.rep_completed {
                tracing::info!(
                    session = %self.id,
                    frame = index,
                    total = state.total_count,
                    "Repetition counted"
                );
            }

            let jpeg = encode_jpeg(&processed.image, self.settings.jpeg_quality)?;
            sink.emit(jpeg, state.total_count).await?;
        }
    }
}
