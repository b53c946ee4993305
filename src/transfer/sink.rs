//! Directory-backed file sink

use super::traits::FileSink;
use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use crate::types::Payload;
use crate::utils::get_unique_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// [`FileSink`] writing payloads into one output directory
pub struct DirectorySink {
    dir: PathBuf,
    collision: FileCollisionAction,
}

impl DirectorySink {
    /// Create a sink for `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>, collision: FileCollisionAction) -> Self {
        Self {
            dir: dir.into(),
            collision,
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save_as_file(&self, payload: &Payload, file_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Save {
                path: self.dir.clone(),
                reason: format!("failed to create output directory: {}", e),
            })?;

        let target = get_unique_path(&self.dir.join(file_name), self.collision)?;

        tokio::fs::write(&target, &payload.bytes)
            .await
            .map_err(|e| Error::Save {
                path: target.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %target.display(), bytes = payload.len(), "Saved payload");
        Ok(target)
    }
}
