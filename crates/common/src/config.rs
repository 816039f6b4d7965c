//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP/WebSocket server settings.
    pub server: ServerConfig,

    /// Per-session streaming settings.
    pub stream: StreamConfig,

    /// Pose-estimation backend selection.
    pub pose: PoseConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Directory where uploaded videos are stored.
    pub uploads_dir: PathBuf,

    /// Maximum accepted upload body size in bytes.
    pub max_upload_bytes: usize,
}

/// Streaming session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upper bound on processed frames per second of source video.
    pub target_fps: f64,

    /// JPEG quality for emitted frames (1-100).
    pub jpeg_quality: u8,

    /// ffmpeg executable used to decode uploads.
    pub ffmpeg_bin: String,

    /// ffprobe executable used to read stream metadata.
    pub ffprobe_bin: String,
}

/// Which pose-estimation collaborator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseBackend {
    /// A long-lived worker process shared by all sessions.
    Process,
    /// Replay of a precomputed landmark track stored next to each video.
    Track,
}

/// Pose-estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub backend: PoseBackend,

    /// Worker executable for the `process` backend.
    pub command: String,

    /// Arguments passed to the worker.
    pub args: Vec<String>,

    /// File name suffix of pose-track sidecars for the `track` backend.
    pub track_suffix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "squatcount=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8002".to_string(),
            uploads_dir: PathBuf::from("videos").join("uploads"),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_fps: 15.0,
            jpeg_quality: 80,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            backend: PoseBackend::Process,
            command: "python3".to_string(),
            args: vec!["pose_worker.py".to_string()],
            track_suffix: ".pose.jsonl".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, crate::error::SquatError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("squatcount").join("config.json")
}
