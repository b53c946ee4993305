//! Shared test doubles and helpers for creating BatchDownloader instances in tests.

use crate::config::Config;
use crate::db::{Database, HistoryStore, NoOpHistoryStore};
use crate::downloader::BatchDownloader;
use crate::error::{Error, FetchError, Result};
use crate::transfer::{FileSink, PayloadFetcher, PlaylistResolver};
use crate::types::{AudioFormat, DownloadTask, Payload, Playlist};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// One recorded fetch call
#[derive(Debug, Clone)]
pub(crate) struct FetchCall {
    pub(crate) source_reference: String,
    pub(crate) format: AudioFormat,
    pub(crate) at: tokio::time::Instant,
}

/// Fetcher that records every call and fails for chosen source references
#[derive(Default)]
pub(crate) struct MockFetcher {
    failing: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail every fetch of `source_reference` with a 500
    pub(crate) fn failing_on(mut self, source_reference: &str) -> Self {
        self.failing.insert(source_reference.to_string());
        self
    }

    /// Take `delay` for each fetch
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn sources(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.source_reference)
            .collect()
    }
}

#[async_trait]
impl PayloadFetcher for MockFetcher {
    async fn fetch_payload(
        &self,
        source_reference: &str,
        format: AudioFormat,
    ) -> std::result::Result<Payload, FetchError> {
        self.calls.lock().unwrap().push(FetchCall {
            source_reference: source_reference.to_string(),
            format,
            at: tokio::time::Instant::now(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(source_reference) {
            return Err(FetchError::Remote {
                status: 500,
                message: format!("cannot fetch {}", source_reference),
            });
        }

        Ok(Payload {
            bytes: source_reference.as_bytes().to_vec(),
            content_type: Some("audio/mpeg".to_string()),
        })
    }
}

/// Sink keeping saved payloads in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    fail: bool,
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sink whose every save fails
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn file_names(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl FileSink for MemorySink {
    async fn save_as_file(&self, payload: &Payload, file_name: &str) -> Result<PathBuf> {
        let path = PathBuf::from("/memory").join(file_name);
        if self.fail {
            return Err(Error::Save {
                path,
                reason: "disk full".to_string(),
            });
        }

        self.saved
            .lock()
            .unwrap()
            .push((file_name.to_string(), payload.bytes.clone()));
        Ok(path)
    }
}

/// Resolver answering with a fixed playlist
pub(crate) struct StaticResolver {
    pub(crate) playlist: Playlist,
}

#[async_trait]
impl PlaylistResolver for StaticResolver {
    async fn resolve(&self, playlist_url: &str) -> Result<Playlist> {
        if self.playlist.tracks.is_empty() {
            return Err(Error::EmptyPlaylist(playlist_url.to_string()));
        }
        Ok(self.playlist.clone())
    }
}

/// Tasks `a`, `b`, ... whose source reference equals their id
pub(crate) fn tasks(ids: &[&str]) -> Vec<DownloadTask> {
    ids.iter()
        .map(|id| DownloadTask::new(*id, format!("Track {}", id.to_uppercase()), *id))
        .collect()
}

/// Config with a short pacing delay and no persistence
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.batch.pacing_delay = Duration::from_millis(50);
    config.batch.shutdown_timeout = Duration::from_secs(1);
    config.persistence.enabled = false;
    config
}

/// Helper to create a test BatchDownloader backed by in-memory doubles
pub(crate) fn create_test_downloader(
    fetcher: Arc<MockFetcher>,
    sink: Arc<MemorySink>,
) -> BatchDownloader {
    BatchDownloader::with_collaborators(
        test_config(),
        fetcher,
        sink,
        Arc::new(NoOpHistoryStore::new()),
    )
    .unwrap()
}

/// Helper to create a test BatchDownloader with a persistent database.
/// Returns the downloader, the database and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader_with_db(
    fetcher: Arc<MockFetcher>,
    sink: Arc<MemorySink>,
) -> (BatchDownloader, Arc<Database>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let db = Arc::new(
        Database::new(&temp_dir.path().join("test.db"))
            .await
            .unwrap(),
    );

    let history: Arc<dyn HistoryStore> = db.clone();
    let downloader =
        BatchDownloader::with_collaborators(test_config(), fetcher, sink, history).unwrap();

    (downloader, db, temp_dir)
}
