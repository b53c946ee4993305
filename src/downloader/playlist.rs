//! Playlist resolution feeding the batch loop.

use crate::error::Result;
use crate::types::{AudioFormat, BatchId, BatchSummary, Playlist};

use super::BatchDownloader;

impl BatchDownloader {
    /// Expand a playlist URL into its tracks
    pub async fn resolve_playlist(&self, playlist_url: &str) -> Result<Playlist> {
        self.collaborators.resolver.resolve(playlist_url).await
    }

    /// Resolve a playlist and download every track as one batch
    ///
    /// Tracks keep their playlist order. Fails before any download when the
    /// playlist cannot be resolved or has no tracks.
    pub async fn download_playlist(
        &self,
        playlist_url: &str,
        format: AudioFormat,
    ) -> Result<BatchSummary> {
        let playlist = self.resolve_playlist(playlist_url).await?;
        tracing::info!(
            playlist = playlist_url,
            title = %playlist.title,
            tracks = playlist.tracks.len(),
            "Downloading playlist"
        );
        self.run_batch(playlist.into_tasks(), format).await
    }

    /// Resolve a playlist and start its batch in the background
    pub async fn start_playlist(&self, playlist_url: &str, format: AudioFormat) -> Result<BatchId> {
        let playlist = self.resolve_playlist(playlist_url).await?;
        self.start_batch(playlist.into_tasks(), format).await
    }
}
