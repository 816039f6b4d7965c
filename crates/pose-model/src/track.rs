//! Precomputed pose tracks.
//!
//! A track stores the estimator output for each decoded frame of a video in
//! JSONL format, one entry per line. Lines starting with `#` are comments.
//! Frame numbers are 1-based and count every decoded frame, sampled or not.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::landmark::PoseLandmarks;

/// One line of a pose track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackEntry {
    /// 1-based decoded frame number.
    pub frame: u64,
    /// Landmarks for the frame, `None` when no person was detected.
    #[serde(default)]
    pub landmarks: Option<PoseLandmarks>,
}

/// Errors raised while reading a track.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: frame {frame} appears more than once")]
    DuplicateFrame { line: usize, frame: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-frame landmark sequence keyed by frame number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseTrack {
    frames: BTreeMap<u64, Option<PoseLandmarks>>,
}

impl PoseTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a track file from disk.
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        let content = std::fs::read_to_string(path)?;
        parse_track(&content)
    }

    /// Record the landmarks for a frame, replacing any previous entry.
    pub fn push(&mut self, frame: u64, landmarks: Option<PoseLandmarks>) {
        self.frames.insert(frame, landmarks);
    }

    /// Landmarks for a frame. Frames absent from the track have none.
    pub fn landmarks_at(&self, frame: u64) -> Option<&PoseLandmarks> {
        self.frames.get(&frame).and_then(Option::as_ref)
    }

    /// Number of frames with an entry.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Parse a JSONL track.
pub fn parse_track(jsonl: &str) -> Result<PoseTrack, TrackError> {
    let mut track = PoseTrack::new();
    for (idx, line) in jsonl.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: TrackEntry = serde_json::from_str(line).map_err(|source| TrackError::Parse {
            line: idx + 1,
            source,
        })?;
        if track.frames.contains_key(&entry.frame) {
            return Err(TrackError::DuplicateFrame {
                line: idx + 1,
                frame: entry.frame,
            });
        }
        track.frames.insert(entry.frame, entry.landmarks);
    }
    Ok(track)
}
