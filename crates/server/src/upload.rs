//! Storage for uploaded videos.

use std::path::{Path, PathBuf};

use squatcount_common::error::{SquatError, SquatResult};
use uuid::Uuid;

/// Flat directory of uploads, each named `<uuid-v4><original extension>`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if needed.
    pub async fn ensure_dir(&self) -> SquatResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            SquatError::upload(format!("Cannot create {}: {e}", self.dir.display()))
        })
    }

    /// Persist an upload and return its identifier.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> SquatResult<String> {
        self.ensure_dir().await?;
        let id = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.dir.join(&id);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SquatError::upload(format!("Cannot write {}: {e}", path.display())))?;
        tracing::info!(id = %id, bytes = bytes.len(), "Upload stored");
        Ok(id)
    }

    /// Path of an existing upload. Identifiers that are not a plain file
    /// name are rejected so a client can never leave the upload directory.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        if !is_plain_file_name(id) {
            return None;
        }
        let path = self.dir.join(id);
        path.is_file().then_some(path)
    }
}

fn is_plain_file_name(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

/// `.mp4` for `clip.mp4`; empty when the name has no usable extension.
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
