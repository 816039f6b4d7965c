//! Check external tools and the pose backend.

use squatcount_common::config::{config_file_path, AppConfig, PoseBackend};
use squatcount_stream_engine::source::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("SquatCount System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[--] Config: defaults ({} not found)", config_path.display());
    }

    let mut ready = true;
    for binary in [&config.stream.ffmpeg_bin, &config.stream.ffprobe_bin] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[FAIL] {binary} not found on PATH (required to decode uploads)");
            ready = false;
        }
    }

    let uploads = &config.server.uploads_dir;
    if uploads.is_dir() {
        println!("[OK] Uploads directory: {}", uploads.display());
    } else {
        println!(
            "[WARN] Uploads directory {} does not exist yet (created on first serve)",
            uploads.display()
        );
    }

    match config.pose.backend {
        PoseBackend::Process => {
            if command_exists(&config.pose.command) {
                println!(
                    "[OK] Pose worker: {} {}",
                    config.pose.command,
                    config.pose.args.join(" ")
                );
            } else {
                println!("[FAIL] Pose worker command {} not found", config.pose.command);
                ready = false;
            }
        }
        PoseBackend::Track => {
            println!(
                "[OK] Pose backend: track replay (sidecar <video>{})",
                config.pose.track_suffix
            );
        }
    }

    println!();
    if ready {
        println!("All required tools are available. SquatCount is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
