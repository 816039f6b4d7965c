//! Run the server.

use squatcount_common::config::AppConfig;
use squatcount_server::AppState;
use squatcount_stream_engine::PoseService;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        bind = %config.server.bind,
        pose_backend = ?config.pose.backend,
        target_fps = config.stream.target_fps,
        "Starting SquatCount"
    );

    let pose = PoseService::from_config(&config.pose)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start pose backend: {e}"))?;

    let bind = config.server.bind.clone();
    squatcount_server::serve(AppState::new(config, pose), &bind).await?;
    Ok(())
}
