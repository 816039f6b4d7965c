//! SquatCount CLI: squat repetition counting server and diagnostics.
//!
//! Usage:
//!   squatcount serve [OPTIONS]     Run the upload + streaming server
//!   squatcount check               Check external tools and pose backend
//!   squatcount probe <VIDEO>       Show stream metadata and sampling stride

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use squatcount_common::config::PoseBackend;

mod commands;

#[derive(Parser)]
#[command(
    name = "squatcount",
    about = "Count squats in uploaded videos and stream annotated frames",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/squatcount/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket server
    Serve {
        /// Listen address, e.g. 0.0.0.0:8002
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory for uploaded videos
        #[arg(long)]
        uploads_dir: Option<PathBuf>,

        /// Pose-estimation backend
        #[arg(long, value_enum)]
        pose_backend: Option<BackendArg>,
    },

    /// Check external tools and the configured pose backend
    Check,

    /// Show a video's dimensions, frame rate, and sampling stride
    Probe {
        /// Path to the video file
        video: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Process,
    Track,
}

impl From<BackendArg> for PoseBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Process => PoseBackend::Process,
            BackendArg::Track => PoseBackend::Track,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = commands::load_config(cli.config.as_deref())?;

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    squatcount_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Serve {
            bind,
            uploads_dir,
            pose_backend,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(dir) = uploads_dir {
                config.server.uploads_dir = dir;
            }
            if let Some(backend) = pose_backend {
                config.pose.backend = backend.into();
            }
            commands::serve::run(config).await
        }
        Commands::Check => commands::check::run(&config),
        Commands::Probe { video } => commands::probe::run(&config, video).await,
    }
}
