//! Sequential frame sources.
//!
//! Uploaded videos are decoded by an ffmpeg subprocess that writes raw
//! `rgb24` frames to its stdout. The session reads them one at a time, so
//! decoding never runs more than a pipe buffer ahead of processing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::RgbImage;
use serde::Deserialize;
use squatcount_common::config::StreamConfig;
use squatcount_common::error::{SquatError, SquatResult};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

/// One decoded frame with its 1-based position in the source.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub index: u64,
    pub image: RgbImage,
}

/// Stream metadata known after opening a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate, when the container reports a usable one.
    pub fps: Option<f64>,
}

/// A sequential source of RGB frames.
///
/// `release` must be called exactly once when the consumer is done; it is
/// idempotent so a second call is harmless.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    fn info(&self) -> SourceInfo;

    /// Read the next frame, or `None` once the source is exhausted.
    async fn read_frame(&mut self) -> SquatResult<Option<RgbImage>>;

    /// Release the underlying resource.
    async fn release(&mut self) -> SquatResult<()>;
}

/// Frame source backed by an `ffmpeg` decoding subprocess.
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: SourceInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    frame_bytes: usize,
    released: bool,
}

impl FfmpegFrameSource {
    /// Probe the video and start decoding it.
    pub async fn open(path: &Path, config: &StreamConfig) -> SquatResult<Self> {
        if !path.is_file() {
            return Err(SquatError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let info = probe_video(&config.ffprobe_bin, path).await?;
        let frame_bytes = info.width as usize * info.height as usize * 3;

        let mut child = Command::new(&config.ffmpeg_bin)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SquatError::decode(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SquatError::decode("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SquatError::decode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            path = %path.display(),
            pid = ?child.id(),
            width = info.width,
            height = info.height,
            fps = ?info.fps,
            "ffmpeg decoder started"
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr_task: Some(stderr_task),
            frame_bytes,
            released: false,
        })
    }

    async fn finish_decoder(&mut self) -> SquatResult<()> {
        self.stdout = None;
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let status = child
            .wait()
            .await
            .map_err(|e| SquatError::decode(format!("Failed to wait on ffmpeg: {e}")))?;
        if status.success() {
            return Ok(());
        }
        let stderr_output = match self.stderr_task.take() {
            Some(task) => task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
            None => String::new(),
        };
        Err(SquatError::decode(format!(
            "ffmpeg failed to decode {} (status {}): {}",
            self.path.display(),
            status,
            stderr_output.trim()
        )))
    }
}

#[async_trait::async_trait]
impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    async fn read_frame(&mut self) -> SquatResult<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.frame_bytes];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = stdout
                .read(&mut buffer[filled..])
                .await
                .map_err(|e| SquatError::decode(format!("Failed reading decoded frame: {e}")))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.finish_decoder().await?;
            return Ok(None);
        }
        if filled < buffer.len() {
            return Err(SquatError::decode(format!(
                "Truncated frame: got {filled} of {} bytes",
                buffer.len()
            )));
        }

        RgbImage::from_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or_else(|| SquatError::decode("Decoded frame has unexpected size"))
    }

    async fn release(&mut self) -> SquatResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.stdout = None;

        if let Some(mut child) = self.child.take() {
            // Already-exited children report an error here; that is fine.
            let _ = child.start_kill();
            child
                .wait()
                .await
                .map_err(|e| SquatError::decode(format!("Failed to reap ffmpeg: {e}")))?;
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        tracing::debug!(path = %self.path.display(), "ffmpeg decoder released");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    side_data_list: Vec<StreamSideData>,
    #[serde(default)]
    tags: StreamTags,
}

#[derive(Debug, Deserialize)]
struct StreamSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees. Newer containers carry it as a display
    /// matrix side data entry, older ones as a `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// Read dimensions and nominal frame rate of the first video stream.
///
/// Dimensions are reported as ffmpeg will decode them: it applies the
/// display rotation, so a quarter turn swaps width and height.
pub async fn probe_video(ffprobe_bin: &str, path: &Path) -> SquatResult<SourceInfo> {
    let output = Command::new(ffprobe_bin)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate:stream_side_data=rotation:stream_tags=rotate",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| SquatError::decode(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(SquatError::decode(format!(
            "ffprobe rejected {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(raw: &[u8]) -> SquatResult<SourceInfo> {
    let probe: ProbeOutput = serde_json::from_slice(raw)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| SquatError::decode("No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(SquatError::decode("Video stream has no dimensions")),
    };
    let (width, height) = if is_quarter_turn(stream.rotation()) {
        (height, width)
    } else {
        (width, height)
    };

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate));

    Ok(SourceInfo { width, height, fps })
}

fn is_quarter_turn(degrees: f64) -> bool {
    (degrees.round() as i64).rem_euclid(180) == 90
}

/// Parse an ffprobe rational such as `30000/1001`. `0/0` means unknown.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse::<f64>().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Whether an executable can be found on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let raw = br#"{"programs":[],"streams":[{"width":640,"height":360,"r_frame_rate":"60/1","avg_frame_rate":"60/1"}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.width, 640);
        assert_eq!(info.height, 360);
        assert_eq!(info.fps, Some(60.0));
    }

    #[test]
    fn test_probe_falls_back_to_average_rate() {
        let raw = br#"{"streams":[{"width":320,"height":240,"r_frame_rate":"0/0","avg_frame_rate":"24/1"}]}"#;
        assert_eq!(parse_probe_output(raw).unwrap().fps, Some(24.0));
    }

    #[test]
    fn test_probe_without_video_stream() {
        assert!(matches!(
            parse_probe_output(br#"{"streams":[]}"#),
            Err(SquatError::Decode { .. })
        ));
    }

    #[test]
    fn test_rotated_stream_reports_decoded_dimensions() {
        let raw = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1","side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let raw = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1","tags":{"rotate":"90"}}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let raw = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1","side_data_list":[{"rotation":180}]}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
    }

    #[test]
    fn test_quarter_turns() {
        assert!(is_quarter_turn(90.0));
        assert!(is_quarter_turn(-90.0));
        assert!(is_quarter_turn(270.0));
        assert!(!is_quarter_turn(0.0));
        assert!(!is_quarter_turn(-180.0));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp4");
        let result = FfmpegFrameSource::open(&missing, &StreamConfig::default()).await;
        assert!(matches!(result, Err(SquatError::FileNotFound { .. })));
    }
}
