//! Construction and shutdown coordination.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::config::Config;
use crate::db::{Database, HistoryStore, NoOpHistoryStore};
use crate::error::{Error, Result};
use crate::transfer::{
    DirectorySink, FileSink, HttpPayloadFetcher, HttpPlaylistResolver, PayloadFetcher,
    PlaylistResolver,
};
use crate::types::{BatchProgress, Event};

use super::{BatchDownloader, BatchSlot, Collaborators};

/// Interval between checks for the active batch during shutdown
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl BatchDownloader {
    /// Create a new BatchDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Creates the output directory
    /// - Opens the SQLite history store (when persistence is enabled) and marks
    ///   batches interrupted by a previous process as failed
    /// - Builds the HTTP fetcher and resolver and the directory sink
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.batch.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.batch.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let history: Arc<dyn HistoryStore> = if config.persistence.enabled {
            let db = Database::new(&config.persistence.database_path).await?;

            let interrupted = db.mark_interrupted().await?;
            if interrupted > 0 {
                tracing::warn!(
                    interrupted,
                    "Marked batches left running by a previous process as failed"
                );
            }

            Arc::new(db)
        } else {
            tracing::info!("Persistence disabled, batch history will not be stored");
            Arc::new(NoOpHistoryStore::new())
        };

        let fetcher: Arc<dyn PayloadFetcher> = Arc::new(HttpPayloadFetcher::new(&config.fetch)?);
        let sink: Arc<dyn FileSink> = Arc::new(DirectorySink::new(
            config.batch.output_dir.clone(),
            config.batch.file_collision,
        ));

        let downloader = Self::with_collaborators(config, fetcher, sink, history)?;

        tracing::info!(
            output_dir = %downloader.config.batch.output_dir.display(),
            service = %downloader.config.fetch.base_url,
            pacing_ms = downloader.config.batch.pacing_delay.as_millis() as u64,
            "Batch downloader initialized"
        );

        Ok(downloader)
    }

    /// Create a downloader around caller-supplied collaborators
    ///
    /// The playlist resolver is built from `config.fetch`; replace it with
    /// [`with_resolver`](Self::with_resolver).
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn PayloadFetcher>,
        sink: Arc<dyn FileSink>,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        config.validate()?;

        let resolver: Arc<dyn PlaylistResolver> =
            Arc::new(HttpPlaylistResolver::new(&config.fetch)?);

        // Buffer of 1000 events per subscriber
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            history,
            event_tx,
            progress: Arc::new(tokio::sync::RwLock::new(BatchProgress::default())),
            slot: BatchSlot::new(),
            collaborators: Collaborators {
                fetcher,
                sink,
                resolver,
            },
        })
    }

    /// Replace the playlist resolver
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn PlaylistResolver>) -> Self {
        self.collaborators.resolver = resolver;
        self
    }

    /// Gracefully shut down the downloader
    ///
    /// 1. Stops accepting new batches
    /// 2. Waits for an active batch to finish, at most `config.batch.shutdown_timeout`
    /// 3. Emits [`Event::Shutdown`]
    ///
    /// A batch still running after the timeout keeps running; its remaining
    /// outcomes are persisted as they complete.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.slot.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new batches");

        let timeout = self.config.batch.shutdown_timeout;
        match tokio::time::timeout(timeout, self.wait_for_active_batch()).await {
            Ok(()) => tracing::info!("No batch in flight"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                batch_id = self.slot.active_batch.load(Ordering::SeqCst),
                "Timeout waiting for the active batch, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// True until [`shutdown`](Self::shutdown) is called
    pub fn is_accepting(&self) -> bool {
        self.slot.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_active_batch(&self) {
        while self.is_running() {
            tracing::debug!(
                batch_id = self.slot.active_batch.load(Ordering::SeqCst),
                "Waiting for active batch to complete"
            );
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }
}
