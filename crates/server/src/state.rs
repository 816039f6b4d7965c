//! Shared server state.

use std::sync::Arc;

use squatcount_common::config::AppConfig;
use squatcount_stream_engine::PoseService;

use crate::upload::UploadStore;

/// Handler state. Cloned per request; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub uploads: Arc<UploadStore>,
    pub pose: PoseService,
}

impl AppState {
    pub fn new(config: AppConfig, pose: PoseService) -> Self {
        let uploads = UploadStore::new(config.server.uploads_dir.clone());
        Self {
            config: Arc::new(config),
            uploads: Arc::new(uploads),
            pose,
        }
    }
}
