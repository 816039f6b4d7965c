//! Streaming socket.
//!
//! ## Protocol
//!
//! ```text
//! client → server   text    "<upload id>"
//! server → client   binary  JPEG frame            ┐ once per
//! server → client   text    {"total_squats": n}   ┘ sampled frame
//! server → client   text    {"error": "..."}        on failure, then close
//! ```
//!
//! An unknown id is answered with `{"error": "File not found"}`. When the
//! video is exhausted the server closes the socket without a final message.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use squatcount_common::error::{SquatError, SquatResult};
use squatcount_stream_engine::{
    FfmpegFrameSource, FrameProcessor, FrameSink, SessionSettings, SessionSummary, StreamSession,
};
use uuid::Uuid;

use crate::protocol::ServerMessage;
use crate::state::AppState;

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// `GET /ws`
pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    let Some(video_id) = next_text(&mut receiver).await else {
        tracing::debug!(session = %session_id, "Client left before naming a video");
        return;
    };
    let video_id = video_id.trim().to_string();
    tracing::info!(session = %session_id, video = %video_id, "Stream requested");

    let Some(path) = state.uploads.resolve(&video_id) else {
        tracing::warn!(session = %session_id, video = %video_id, "Requested video not found");
        send_error(&mut sender, "File not found").await;
        close(&mut sender).await;
        return;
    };

    let mut sink = WsSink { sender };
    match stream_video(&state, &session_id, &path, &mut sink, receiver).await {
        Ok(summary) if summary.stopped => {
            tracing::info!(session = %session_id, "Client disconnected during stream");
        }
        Ok(_) => close(&mut sink.sender).await,
        Err(SquatError::Transport { message }) => {
            tracing::debug!(session = %session_id, %message, "Client connection lost");
        }
        Err(SquatError::FileNotFound { .. }) => {
            send_error(&mut sink.sender, "File not found").await;
            close(&mut sink.sender).await;
        }
        Err(err) => {
            tracing::warn!(session = %session_id, error = %err, "Stream failed");
            send_error(&mut sink.sender, &error_text(&err, &path, &video_id)).await;
            close(&mut sink.sender).await;
        }
    }
}

async fn stream_video(
    state: &AppState,
    session_id: &str,
    path: &Path,
    sink: &mut WsSink,
    receiver: WsReceiver,
) -> SquatResult<SessionSummary> {
    let estimator = state.pose.estimator_for(path)?;
    let session = StreamSession::new(
        session_id,
        FrameProcessor::new(estimator),
        SessionSettings::from(&state.config.stream),
    );
    let mut source = FfmpegFrameSource::open(path, &state.config.stream).await?;

    let watcher = tokio::spawn(watch_for_close(receiver, session.stop_flag()));
    let result = session.run(&mut source, sink).await;
    watcher.abort();
    result
}

/// Raise `stop` once the client closes its side of the socket.
async fn watch_for_close(mut receiver: WsReceiver, stop: Arc<AtomicBool>) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    stop.store(true, Ordering::SeqCst);
}

/// First text message from the client, skipping control frames.
async fn next_text(receiver: &mut WsReceiver) -> Option<String> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Client-facing text for a session failure. Server paths are replaced by
/// the upload id the client asked for.
fn error_text(err: &SquatError, path: &Path, video_id: &str) -> String {
    let text = match err {
        SquatError::Decode { message }
        | SquatError::Pose { message }
        | SquatError::PoseUnavailable { message }
        | SquatError::Render { message } => message.clone(),
        other => other.to_string(),
    };
    let mut text = text.replace(&path.display().to_string(), video_id);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        text = text.replace(&format!("{}/", dir.display()), "");
    }
    text
}

async fn send_error(sender: &mut WsSender, message: &str) {
    match ServerMessage::error(message).to_json() {
        Ok(json) => {
            if let Err(err) = sender.send(Message::Text(json.into())).await {
                tracing::debug!(error = %err, "Failed to deliver error message");
            }
        }
        Err(err) => tracing::error!(error = %err, "Failed to serialize error message"),
    }
}

async fn close(sender: &mut WsSender) {
    // The peer may already be gone.
    let _ = sender.send(Message::Close(None)).await;
}

/// Delivers session output as a binary frame followed by the count.
struct WsSink {
    sender: WsSender,
}

#[async_trait::async_trait]
impl FrameSink for WsSink {
    async fn emit(&mut self, jpeg: Vec<u8>, total_count: u64) -> SquatResult<()> {
        self.sender
            .send(Message::Binary(jpeg.into()))
            .await
            .map_err(|e| SquatError::transport(format!("Failed to send frame: {e}")))?;
        let count = ServerMessage::count(total_count).to_json()?;
        self.sender
            .send(Message::Text(count.into()))
            .await
            .map_err(|e| SquatError::transport(format!("Failed to send count: {e}")))
    }
}
