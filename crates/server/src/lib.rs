//! SquatCount Server
//!
//! HTTP and WebSocket surface:
//! - `POST /upload/` stores a video and returns its identifier
//! - `GET /ws` streams annotated frames and the running squat count
//! - `GET /health` reports liveness and the active pose backend

pub mod protocol;
pub mod routes;
pub mod state;
pub mod upload;
pub mod ws;

pub use routes::router;
pub use state::AppState;
pub use upload::UploadStore;

use squatcount_common::error::{SquatError, SquatResult};

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> SquatResult<()> {
    state.uploads.ensure_dir().await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SquatError::config(format!("Cannot bind {addr}: {e}")))?;
    tracing::info!(
        addr = %addr,
        uploads = %state.uploads.dir().display(),
        "SquatCount server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
