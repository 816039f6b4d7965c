//! Error types shared across SquatCount crates.

use std::path::PathBuf;

/// Top-level error type for SquatCount operations.
#[derive(Debug, thiserror::Error)]
pub enum SquatError {
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A single frame could not be analyzed. Callers treat this as a
    /// detection miss for that frame.
    #[error("Pose estimation error: {message}")]
    Pose { message: String },

    /// The pose collaborator itself is gone (worker exited, pipe closed).
    #[error("Pose estimator unavailable: {message}")]
    PoseUnavailable { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Upload error: {message}")]
    Upload { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SquatError.
pub type SquatResult<T> = Result<T, SquatError>;

impl SquatError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn pose(msg: impl Into<String>) -> Self {
        Self::Pose {
            message: msg.into(),
        }
    }

    pub fn pose_unavailable(msg: impl Into<String>) -> Self {
        Self::PoseUnavailable {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the failure only affects the frame it occurred on.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::Pose { .. })
    }
}
