//! Pose-estimation collaborators.
//!
//! The model itself lives outside this workspace. Two adapters reach it:
//! a long-lived worker process speaking a small binary/JSON protocol over
//! its stdio, and a replay of landmarks precomputed into a sidecar track.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use serde::Deserialize;
use squatcount_common::config::{PoseBackend, PoseConfig};
use squatcount_common::error::{SquatError, SquatResult};
use squatcount_pose_model::{PoseLandmarks, PoseTrack, TrackError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::source::VideoFrame;

/// Produces landmarks for at most one person per frame.
///
/// `Ok(None)` means nobody was detected. `SquatError::Pose` reports a
/// failure confined to this frame; any other error means the estimator can
/// no longer serve requests.
#[async_trait::async_trait]
pub trait PoseEstimator: Send + Sync {
    async fn estimate(&self, frame: &VideoFrame) -> SquatResult<Option<PoseLandmarks>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Replays a precomputed [`PoseTrack`] keyed by decoded frame number.
pub struct TrackPoseEstimator {
    track: PoseTrack,
}

impl TrackPoseEstimator {
    pub fn new(track: PoseTrack) -> Self {
        Self { track }
    }

    /// Load the sidecar track stored next to `video`.
    pub fn from_video(video: &Path, suffix: &str) -> SquatResult<Self> {
        let path = sidecar_path(video, suffix);
        match PoseTrack::load(&path) {
            Ok(track) => {
                tracing::debug!(path = %path.display(), frames = track.len(), "Pose track loaded");
                Ok(Self::new(track))
            }
            Err(TrackError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Err(
                SquatError::pose_unavailable(format!("No pose track at {}", path.display())),
            ),
            Err(err) => Err(SquatError::pose_unavailable(format!(
                "Invalid pose track {}: {err}",
                path.display()
            ))),
        }
    }
}

#[async_trait::async_trait]
impl PoseEstimator for TrackPoseEstimator {
    async fn estimate(&self, frame: &VideoFrame) -> SquatResult<Option<PoseLandmarks>> {
        Ok(self.track.landmarks_at(frame.index).cloned())
    }

    fn name(&self) -> &str {
        "track"
    }
}

/// `clip.mp4` + `.pose.jsonl` → `clip.mp4.pose.jsonl`.
pub fn sidecar_path(video: &Path, suffix: &str) -> PathBuf {
    let mut name = video.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    video.with_file_name(name)
}

/// One line written by the worker per request.
#[derive(Debug, Deserialize)]
struct WorkerReply {
    #[serde(default)]
    landmarks: Option<PoseLandmarks>,
    #[serde(default)]
    error: Option<String>,
}

struct Worker {
    // Held so the process is killed when the worker is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    fn start(command: &str, args: &[String]) -> SquatResult<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SquatError::pose_unavailable(format!("Failed to start pose worker {command}: {e}"))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SquatError::pose_unavailable("Failed to capture worker stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SquatError::pose_unavailable("Failed to capture worker stdout"))?;

        tracing::info!(command, ?args, pid = ?child.id(), "Pose worker started");

        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn exchange(
        &mut self,
        command: &str,
        frame: &VideoFrame,
    ) -> SquatResult<Option<PoseLandmarks>> {
        let (width, height) = frame.image.dimensions();
        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&width.to_le_bytes());
        header[4..].copy_from_slice(&height.to_le_bytes());

        let unavailable =
            |e: std::io::Error| SquatError::pose_unavailable(format!("Pose worker pipe: {e}"));
        self.stdin.write_all(&header).await.map_err(unavailable)?;
        self.stdin
            .write_all(frame.image.as_raw())
            .await
            .map_err(unavailable)?;
        self.stdin.flush().await.map_err(unavailable)?;

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await.map_err(unavailable)?;
        if read == 0 {
            return Err(SquatError::pose_unavailable(format!(
                "Pose worker {command} exited"
            )));
        }

        parse_reply(&line)
    }
}

/// Talks to an external pose worker over stdin/stdout.
///
/// Request: little-endian `u32` width, `u32` height, then `width * height * 3`
/// RGB bytes. Reply: one JSON line, `{"landmarks": ... | null}` or
/// `{"error": "..."}`. Requests are serialized through a mutex so a reply is
/// always read by the caller that sent the matching request.
///
/// A worker that stops answering is dropped, which kills it, and the next
/// request starts a fresh one. The session that saw the failure still ends
/// with `PoseUnavailable`; later sessions are unaffected.
pub struct ProcessPoseEstimator {
    command: String,
    args: Vec<String>,
    worker: Mutex<Option<Worker>>,
}

impl ProcessPoseEstimator {
    pub async fn spawn(command: &str, args: &[String]) -> SquatResult<Self> {
        let worker = Worker::start(command, args)?;
        Ok(Self {
            command: command.to_string(),
            args: args.to_vec(),
            worker: Mutex::new(Some(worker)),
        })
    }
}

#[async_trait::async_trait]
impl PoseEstimator for ProcessPoseEstimator {
    async fn estimate(&self, frame: &VideoFrame) -> SquatResult<Option<PoseLandmarks>> {
        let mut slot = self.worker.lock().await;
        // Taken out for the exchange: a request cancelled halfway leaves the
        // pipe out of step, so that worker must not be reused either.
        let mut worker = match slot.take() {
            Some(worker) => worker,
            None => Worker::start(&self.command, &self.args)?,
        };

        let result = worker.exchange(&self.command, frame).await;
        match &result {
            Err(SquatError::PoseUnavailable { message }) => {
                tracing::warn!(command = %self.command, error = %message, "Pose worker discarded");
            }
            _ => *slot = Some(worker),
        }
        result
    }

    fn name(&self) -> &str {
        "process"
    }
}

fn parse_reply(line: &str) -> SquatResult<Option<PoseLandmarks>> {
    let reply: WorkerReply = serde_json::from_str(line.trim()).map_err(|e| {
        SquatError::pose_unavailable(format!("Malformed pose worker reply: {e}"))
    })?;
    match reply.error {
        Some(message) => Err(SquatError::pose(message)),
        None => Ok(reply.landmarks),
    }
}

/// Server-wide handle on the configured pose backend.
#[derive(Clone)]
pub enum PoseService {
    /// One estimator used by every session.
    Shared(Arc<dyn PoseEstimator>),
    /// A fresh track replay per video, read from its sidecar file.
    TrackSidecar { suffix: String },
}

impl PoseService {
    pub async fn from_config(config: &PoseConfig) -> SquatResult<Self> {
        match config.backend {
            PoseBackend::Process => {
                let estimator = ProcessPoseEstimator::spawn(&config.command, &config.args).await?;
                Ok(Self::Shared(Arc::new(estimator)))
            }
            PoseBackend::Track => Ok(Self::TrackSidecar {
                suffix: config.track_suffix.clone(),
            }),
        }
    }

    /// Estimator to use for a session streaming `video`.
    pub fn estimator_for(&self, video: &Path) -> SquatResult<Arc<dyn PoseEstimator>> {
        match self {
            Self::Shared(estimator) => Ok(Arc::clone(estimator)),
            Self::TrackSidecar { suffix } => {
                Ok(Arc::new(TrackPoseEstimator::from_video(video, suffix)?))
            }
        }
    }
}
