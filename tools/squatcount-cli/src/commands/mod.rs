pub mod check;
pub mod probe;
pub mod serve;

use std::path::Path;

use squatcount_common::config::AppConfig;

/// Explicit paths must load; the default location falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display())),
        None => Ok(AppConfig::load()),
    }
}
