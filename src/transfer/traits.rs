//! Collaborator traits consumed by the batch loop

use crate::error::FetchError;
use crate::types::{AudioFormat, Payload, Playlist};
use async_trait::async_trait;
use std::path::PathBuf;

/// "Download one item" capability
///
/// Called exactly once per task by the batch loop (unless retries are
/// configured). Any `Err` becomes a failed outcome for that task only.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    /// Fetch the raw payload behind `source_reference` in the requested format
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] on transport failure
    /// - [`FetchError::Remote`] on a non-success response
    /// - [`FetchError::EmptyPayload`] when the response carries no bytes
    async fn fetch_payload(
        &self,
        source_reference: &str,
        format: AudioFormat,
    ) -> Result<Payload, FetchError>;
}

/// "Create a downloadable artifact" capability
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Persist `payload` under `file_name` and return where it ended up
    ///
    /// The returned path may differ from the requested name when collisions
    /// are resolved by renaming.
    async fn save_as_file(&self, payload: &Payload, file_name: &str) -> crate::Result<PathBuf>;
}

/// Resolves a playlist URL into its tracks
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Resolve `playlist_url`, keeping playlist order
    async fn resolve(&self, playlist_url: &str) -> crate::Result<Playlist>;
}
