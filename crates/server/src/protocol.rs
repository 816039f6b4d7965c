//! JSON messages exchanged with clients.

use serde::{Deserialize, Serialize};

/// Text message sent over the streaming socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Running count, sent right after each frame.
    Count { total_squats: u64 },
    /// Terminal failure; the socket is closed afterwards.
    Error { error: String },
}

impl ServerMessage {
    pub fn count(total_squats: u64) -> Self {
        Self::Count { total_squats }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of a successful `POST /upload/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
