//! Show stream metadata for a video.

use std::path::PathBuf;

use squatcount_common::clock::sampling_stride;
use squatcount_common::config::AppConfig;
use squatcount_pose_model::PoseTrack;
use squatcount_stream_engine::estimator::sidecar_path;
use squatcount_stream_engine::source::probe_video;

pub async fn run(config: &AppConfig, video: PathBuf) -> anyhow::Result<()> {
    if !video.is_file() {
        anyhow::bail!("No such file: {}", video.display());
    }

    let info = probe_video(&config.stream.ffprobe_bin, &video)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to probe video: {e}"))?;
    let stride = sampling_stride(info.fps, config.stream.target_fps);

    println!("Video: {}", video.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    match info.fps {
        Some(fps) => println!("  Frame rate: {fps:.3} fps"),
        None => println!("  Frame rate: unknown"),
    }
    println!(
        "  Sampling: every {} frame(s) (target {} fps)",
        stride, config.stream.target_fps
    );

    let track = sidecar_path(&video, &config.pose.track_suffix);
    if track.is_file() {
        match PoseTrack::load(&track) {
            Ok(t) => println!("  Pose track: {} ({} frames)", track.display(), t.len()),
            Err(e) => println!("  Pose track: {} (invalid: {e})", track.display()),
        }
    }

    Ok(())
}
