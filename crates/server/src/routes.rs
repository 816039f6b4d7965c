//! HTTP routes.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use squatcount_common::error::{SquatError, SquatResult};
use squatcount_stream_engine::PoseService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::protocol::{ErrorResponse, UploadResponse};
use crate::state::AppState;
use crate::ws::stream_handler;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/upload/", post(upload_video))
        .route("/ws", get(stream_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let backend = match &state.pose {
        PoseService::Shared(estimator) => estimator.name().to_string(),
        PoseService::TrackSidecar { .. } => "track".to_string(),
    };
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pose_backend": backend,
    }))
}

/// `POST /upload/` with multipart field `file`.
async fn upload_video(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    match receive_upload(&state, &mut multipart).await {
        Ok(filename) => Json(UploadResponse { filename }).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Upload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn receive_upload(state: &AppState, multipart: &mut Multipart) -> SquatResult<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SquatError::upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| SquatError::upload(e.to_string()))?;
        return state.uploads.save(original_name.as_deref(), &bytes).await;
    }
    Err(SquatError::upload("Missing multipart field `file`"))
}
